//! HTML pages. Every interpolated value goes through [`esc`].

use crate::bundle::BUNDLE_ELEMENT_ID;
use crate::config::AppConfig;
use crate::render::{CHART_TARGET_ID, COLOR_ATTR, POINTS_ATTR};
use crate::scores::Scores;
use serde::Deserialize;

/// Evaluation plugins offered on the index form, as `(value, label)`.
pub const AVAILABLE_PLUGINS: [(&str, &str); 3] = [
    ("signposting", "Signposting (Zenodo/CSIC)"),
    ("oai_pmh", "OAI-PMH"),
    ("custom_plugin", "Custom Plugin"),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentifierForm {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub plugin: String,
}

impl IdentifierForm {
    /// Trimmed `(item_id, plugin)` when both are present and the plugin is
    /// known, otherwise a message for the form.
    pub fn validate(&self) -> Result<(String, String), &'static str> {
        let item_id = self.item_id.trim();
        let plugin = self.plugin.trim();
        if item_id.is_empty() {
            return Err("Please enter a Handle PID, DOI or DIGITAL.CSIC ID.");
        }
        if !AVAILABLE_PLUGINS.iter().any(|(value, _)| *value == plugin) {
            return Err("Please select a plugin.");
        }
        Ok((item_id.to_string(), plugin.to_string()))
    }
}

/// Everything the evaluation page shows.
#[derive(Debug, Clone)]
pub struct EvaluationView {
    pub resource_id: String,
    pub plugin_name: String,
    pub evaluated_at: String,
    pub scores: Scores,
}

pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn layout(config: &AppConfig, body: &str, with_chart: bool) -> String {
    let chart_script = match (&config.chart_js_url, with_chart) {
        (Some(url), true) => format!("<script src=\"{}\"></script>", esc(url)),
        _ => String::new(),
    };
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title>\
         <link rel=\"stylesheet\" href=\"/static/css/theme.css\">\
         <script src=\"/static/js/selector.js\"></script>\
         <script src=\"/static/js/polling.js\"></script>{chart_script}</head>\
         <body><nav class=\"topbar\"><a href=\"{logo_url}\"><img src=\"/static/img/{logo_image}\" alt=\"logo\"></a>\
         <a href=\"/\"><strong>{title}</strong></a></nav><main>{body}</main></body></html>",
        title = esc(&config.title),
        logo_url = esc(&config.logo_url),
        logo_image = esc(&config.logo_image),
    )
}

pub fn index_page(config: &AppConfig, form: &IdentifierForm, error: Option<&str>) -> String {
    let options: String = AVAILABLE_PLUGINS
        .iter()
        .map(|(value, label)| {
            let selected = if form.plugin == *value { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{selected}>{}</option>",
                esc(value),
                esc(label)
            )
        })
        .collect();
    let error_html = error
        .map(|msg| format!("<p class=\"form-error\">{}</p>", esc(msg)))
        .unwrap_or_default();
    let body = format!(
        "<section class=\"card\"><h1>Evaluate a digital object</h1>{error_html}\
         <form method=\"post\" action=\"/\">\
         <label for=\"item_id\">Handle PID, DOI or DIGITAL.CSIC ID</label>\
         <input id=\"item_id\" name=\"item_id\" type=\"text\" required value=\"{item_id}\">\
         <label for=\"plugin\">Select plugin</label>\
         <select id=\"plugin\" name=\"plugin\" required>{options}</select>\
         <button type=\"submit\">Evaluate</button></form></section>",
        item_id = esc(&form.item_id),
    );
    layout(config, &body, false)
}

pub fn error_page(config: &AppConfig, message: &str) -> String {
    let body = format!(
        "<section class=\"card error\"><h1>Something went wrong</h1><p>{}</p>\
         <p><a href=\"/\">Back to the form</a></p></section>",
        esc(message)
    );
    layout(config, &body, false)
}

fn progress(points: f64, color: &str) -> String {
    format!(
        "<div class=\"progress\"><div class=\"fair-progress\" {POINTS_ATTR}=\"{points}\" {COLOR_ATTR}=\"{}\"></div></div>",
        esc(color)
    )
}

pub fn evaluation_page(config: &AppConfig, view: &EvaluationView) -> String {
    let scores = &view.scores;
    let mut body = String::with_capacity(16 * 1024);

    body.push_str(&format!(
        "<section class=\"card eval-header\"><h1>Evaluation of {}</h1>\
         <p>Plugin: <code>{}</code> &middot; Evaluated at <time>{}</time></p></section>",
        esc(&view.resource_id),
        esc(&view.plugin_name),
        esc(&view.evaluated_at),
    ));

    body.push_str(&format!(
        "<section class=\"card overall\"><h2>FAIR score: <span id=\"fair-points\">{}</span>%</h2>{}</section>",
        scores.fair_points,
        progress(scores.fair_points, &scores.fair_color),
    ));

    body.push_str("<section class=\"areas\">");
    for (summary, principle) in scores.summary_by_area().iter().zip(&scores.principles) {
        body.push_str(&format!(
            "<div class=\"card area\" data-area=\"{name}\"><h3>{area}</h3><p>{score} / {max}</p>{bar}</div>",
            name = esc(&principle.name),
            area = esc(&summary.area),
            score = summary.score,
            max = summary.max,
            bar = progress(principle.result.points, &principle.result.color),
        ));
    }
    body.push_str("</section>");

    body.push_str(&format!(
        "<section class=\"card chart\"><canvas id=\"{CHART_TARGET_ID}\" width=\"360\" height=\"360\"></canvas></section>"
    ));

    body.push_str("<section class=\"indicators\">");
    for principle in &scores.principles {
        body.push_str(&format!(
            "<details class=\"card\"><summary>{} ({} indicators)</summary><ul>",
            esc(&principle.name),
            principle.indicators.len()
        ));
        for indicator in &principle.indicators {
            let messages: String = indicator
                .messages
                .iter()
                .map(|m| format!("<li>{}</li>", esc(m)))
                .collect();
            body.push_str(&format!(
                "<li class=\"indicator\" data-indicator=\"{id}\"><strong title=\"{name}\">{title}</strong> \
                 <span class=\"status\">{status}</span> <span class=\"points\">{points}</span> \
                 <span class=\"weight\">weight {weight}</span>{bar}\
                 <ul class=\"indicator-messages\">{messages}</ul></li>",
                id = esc(&indicator.id),
                name = esc(&indicator.name),
                title = esc(&indicator.name_smart),
                weight = indicator.weight,
                status = esc(&indicator.test_status),
                points = indicator.points,
                bar = progress(indicator.points, &indicator.color),
            ));
        }
        body.push_str("</ul></details>");
    }
    body.push_str("</section>");

    body.push_str(&format!(
        "<script id=\"{BUNDLE_ELEMENT_ID}\" type=\"application/json\">{}</script>\
         <script>window.FAIR_DATA = JSON.parse(document.getElementById(\"{BUNDLE_ELEMENT_ID}\").textContent || \"{{}}\");</script>",
        scores.bundle().to_script_json()
    ));

    layout(config, &body, true)
}
