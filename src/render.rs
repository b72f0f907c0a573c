use crate::bundle::{ChartEntry, EvaluationBundle, script_safe_json};
use crate::dom::{Selection, parse_document};
use kuchiki::NodeRef;
use kuchiki::traits::*;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Elements painted as progress bars.
pub const PROGRESS_SELECTOR: &str = ".fair-progress";
pub const POINTS_ATTR: &str = "data-points";
pub const COLOR_ATTR: &str = "data-color";
/// Element id of the optional chart canvas.
pub const CHART_TARGET_ID: &str = "fairChart";
pub const WIDTH_TRANSITION: &str = "width 0.6s ease-in-out";
pub const CHART_CUTOUT: &str = "60%";

#[derive(Debug, Error)]
pub enum RenderError {
    #[allow(dead_code)]
    #[error("chart construction failed: {0}")]
    Chart(String),
    #[error("html manipulation failed: {0}")]
    Html(String),
}

/// Something able to draw the aggregate chart into a target element.
pub trait ChartBackend: Send + Sync {
    fn construct(&self, target: &NodeRef, spec: &ChartSpec) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub data: Vec<f64>,
    pub background_color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub cutout: String,
    pub plugins: ChartPlugins,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlugins {
    pub legend: LegendOptions,
    pub tooltip: TooltipOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendOptions {
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipOptions {
    pub enabled: bool,
}

impl ChartSpec {
    /// Ring chart with the legend below and tooltips on.
    pub fn doughnut(entries: &[ChartEntry]) -> Self {
        Self {
            kind: "doughnut".to_string(),
            data: ChartData {
                labels: entries.iter().map(|e| e.label.clone()).collect(),
                datasets: vec![ChartDataset {
                    data: entries.iter().map(|e| e.value).collect(),
                    background_color: entries.iter().map(|e| e.color.clone()).collect(),
                }],
            },
            options: ChartOptions {
                cutout: CHART_CUTOUT.to_string(),
                plugins: ChartPlugins {
                    legend: LegendOptions {
                        position: "bottom".to_string(),
                    },
                    tooltip: TooltipOptions { enabled: true },
                },
            },
        }
    }
}

/// Emits an inline script constructing the chart with Chart.js once the page
/// loads. The page itself is responsible for loading the library.
#[derive(Debug, Clone, Default)]
pub struct ChartJsBackend;

impl ChartBackend for ChartJsBackend {
    fn construct(&self, target: &NodeRef, spec: &ChartSpec) -> Result<(), RenderError> {
        let script = format!(
            "<script>(function () {{ var el = document.getElementById(\"{CHART_TARGET_ID}\"); if (el && window.Chart) {{ new Chart(el, {}); }} }})();</script>",
            script_safe_json(spec)
        );
        let wrapper_html = format!("<div id=\"__fair_chart_wrapper\">{script}</div>");
        let fragment_doc = kuchiki::parse_html().one(wrapper_html);
        let wrapper = fragment_doc
            .select_first("#__fair_chart_wrapper")
            .map_err(|_| RenderError::Html("chart script wrapper missing".to_string()))?;
        let children: Vec<_> = wrapper.as_node().children().collect();
        for child in children.into_iter().rev() {
            target.insert_after(child);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPaint {
    pub percent: f64,
    pub color: String,
}

/// What one render pass did to a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderReport {
    pub progress: Vec<ProgressPaint>,
    pub chart: Option<ChartSpec>,
}

/// Paints progress nodes and the aggregate chart into a page, once.
#[derive(Clone, Default)]
pub struct ScoreRenderer {
    chart: Option<Arc<dyn ChartBackend>>,
}

impl ScoreRenderer {
    pub fn new(chart: Option<Arc<dyn ChartBackend>>) -> Self {
        Self { chart }
    }

    pub fn without_chart() -> Self {
        Self { chart: None }
    }

    pub fn has_chart_backend(&self) -> bool {
        self.chart.is_some()
    }

    /// Parse `html`, render it using the bundle embedded in the page, and
    /// serialize the result.
    pub fn render_html(&self, html: &str) -> (String, RenderReport) {
        let document = parse_document(html);
        let report = self.render(&document);
        (document.to_string(), report)
    }

    /// Render using the bundle embedded in the page.
    pub fn render(&self, document: &NodeRef) -> RenderReport {
        let bundle = EvaluationBundle::from_document(document);
        self.render_with_bundle(document, Some(&bundle))
    }

    /// Render with an explicit bundle; `None` behaves as an empty bundle.
    pub fn render_with_bundle(
        &self,
        document: &NodeRef,
        bundle: Option<&EvaluationBundle>,
    ) -> RenderReport {
        let empty = EvaluationBundle::default();
        let bundle = bundle.unwrap_or(&empty);

        let progress = paint_progress(document);
        let chart = self.draw_chart(document, bundle);
        debug!(
            progress_nodes = progress.len(),
            chart = chart.is_some(),
            "rendered evaluation scores"
        );
        RenderReport { progress, chart }
    }

    fn draw_chart(&self, document: &NodeRef, bundle: &EvaluationBundle) -> Option<ChartSpec> {
        let selection = Selection::first(document, &format!("#{CHART_TARGET_ID}"));
        let (Some(target), Some(backend)) = (selection.node(), self.chart.as_ref()) else {
            return None;
        };
        let spec = ChartSpec::doughnut(&bundle.aggregate_view());
        match backend.construct(target, &spec) {
            Ok(()) => Some(spec),
            Err(err) => {
                warn!(?err, "chart backend failed; leaving chart target empty");
                None
            }
        }
    }
}

fn paint_progress(document: &NodeRef) -> Vec<ProgressPaint> {
    let Ok(nodes) = document.select(PROGRESS_SELECTOR) else {
        return Vec::new();
    };
    nodes
        .map(|element| {
            let mut attrs = element.attributes.borrow_mut();
            let percent = clamp_percent(attrs.get(POINTS_ATTR));
            let color = attrs
                .get(COLOR_ATTR)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(crate::bundle::NEUTRAL_GRAY)
                .to_string();
            let style = merge_style(
                attrs.get("style").unwrap_or_default(),
                &[
                    ("width", format!("{percent}%")),
                    ("background-color", color.clone()),
                    ("transition", WIDTH_TRANSITION.to_string()),
                ],
            );
            attrs.insert("style", style);
            ProgressPaint { percent, color }
        })
        .collect()
}

/// Parse a point value and clamp it into `[0, 100]`; missing, unparseable or
/// non-finite values are 0.
pub fn clamp_percent(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, 100.0)
}

/// Overwrite the given properties in an inline style, keeping the rest.
fn merge_style(existing: &str, updates: &[(&str, String)]) -> String {
    let mut declarations: Vec<String> = existing
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl.split(':').next().unwrap_or_default().trim();
            !updates
                .iter()
                .any(|(name, _)| property.eq_ignore_ascii_case(name))
        })
        .map(str::to_string)
        .collect();
    declarations.extend(updates.iter().map(|(name, value)| format!("{name}: {value}")));
    let mut style = declarations.join("; ");
    style.push(';');
    style
}
