use crate::dom::Selection;
use kuchiki::NodeRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Key of the overall FAIR score, left out of the aggregate chart.
pub const OVERALL_KEY: &str = "overall";
/// Fill used whenever a colour is missing.
pub const NEUTRAL_GRAY: &str = "#cccccc";
/// Id of the `<script type="application/json">` element carrying the bundle.
pub const BUNDLE_ELEMENT_ID: &str = "fair-data";

/// Scores and colours per indicator group, as embedded in evaluation pages
/// and exposed to browser scripts as `window.FAIR_DATA`.
///
/// Both maps keep insertion order so chart slices follow page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationBundle {
    #[serde(default)]
    pub aggregated: Map<String, Value>,
    #[serde(default)]
    pub colours: Map<String, Value>,
}

/// One slice of the aggregate chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartEntry {
    pub label: String,
    pub value: f64,
    pub color: String,
}

impl EvaluationBundle {
    pub fn insert(&mut self, group: &str, score: f64, colour: &str) {
        self.aggregated.insert(group.to_string(), Value::from(score));
        self.colours
            .insert(group.to_string(), Value::String(colour.to_string()));
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.aggregated.is_empty() && self.colours.is_empty()
    }

    /// Score for a group, 0 when missing or not numeric.
    pub fn score(&self, group: &str) -> f64 {
        match self.aggregated.get(group) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Colour for a group, [`NEUTRAL_GRAY`] when missing or empty.
    pub fn colour(&self, group: &str) -> &str {
        self.colours
            .get(group)
            .and_then(Value::as_str)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(NEUTRAL_GRAY)
    }

    /// Every score group except [`OVERALL_KEY`], in bundle order.
    pub fn aggregate_view(&self) -> Vec<ChartEntry> {
        self.aggregated
            .keys()
            .filter(|key| key.as_str() != OVERALL_KEY)
            .map(|key| ChartEntry {
                label: key.clone(),
                value: self.score(key),
                color: self.colour(key).to_string(),
            })
            .collect()
    }

    /// Lenient parse: malformed JSON or a non-object field yields empty maps.
    pub fn from_json_str(raw: &str) -> Self {
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(?err, "malformed evaluation bundle; using empty bundle");
                return Self::default();
            }
        };
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };
        Self {
            aggregated: field("aggregated"),
            colours: field("colours"),
        }
    }

    /// Read the bundle embedded in a page. A page without one gets an empty
    /// bundle.
    pub fn from_document(document: &NodeRef) -> Self {
        match Selection::first(document, &format!("#{BUNDLE_ELEMENT_ID}")).text() {
            Some(raw) => Self::from_json_str(&raw),
            None => {
                debug!("page carries no evaluation bundle");
                Self::default()
            }
        }
    }

    /// JSON safe to place inside a `<script>` element.
    pub fn to_script_json(&self) -> String {
        script_safe_json(self)
    }
}

/// Serialize for inline `<script>` content; `</` is escaped so the payload
/// cannot close the element early.
pub fn script_safe_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
}
