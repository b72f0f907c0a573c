use crate::bundle::{EvaluationBundle, OVERALL_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// FAIR principles in display order.
pub const PRINCIPLES: [&str; 4] = ["findable", "accessible", "interoperable", "reusable"];

pub const GREEN: &str = "#2ECC71";
pub const YELLOW: &str = "#F4D03F";
pub const RED: &str = "#E74C3C";

/// Maximum score of an area; indicator points are percentages.
pub const DEFAULT_AREA_MAX: u32 = 100;

/// Colour band for a 0..=100 score.
pub fn colour_for(value: f64) -> &'static str {
    if value >= 75.0 {
        GREEN
    } else if value >= 50.0 {
        YELLOW
    } else {
        RED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: String,
    pub name: String,
    pub name_smart: String,
    pub points: f64,
    pub weight: f64,
    pub color: String,
    pub test_status: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipleResult {
    pub points: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principle {
    pub name: String,
    pub indicators: Vec<Indicator>,
    pub result: PrincipleResult,
}

/// Aggregated view of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub principles: Vec<Principle>,
    pub fair_points: f64,
    pub fair_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaSummary {
    pub area: String,
    pub score: i64,
    pub max: u32,
}

impl Scores {
    #[allow(dead_code)]
    pub fn principle(&self, name: &str) -> Option<&Principle> {
        self.principles.iter().find(|p| p.name == name)
    }

    /// The data bundle embedded in evaluation pages: one score and colour per
    /// principle plus the overall FAIR score.
    pub fn bundle(&self) -> EvaluationBundle {
        let mut bundle = EvaluationBundle::default();
        for principle in &self.principles {
            bundle.insert(&principle.name, principle.result.points, &principle.result.color);
        }
        bundle.insert(OVERALL_KEY, self.fair_points, &self.fair_color);
        bundle
    }

    pub fn summary_by_area(&self) -> Vec<AreaSummary> {
        self.principles
            .iter()
            .map(|p| AreaSummary {
                area: capitalize(&p.name),
                score: p.result.points.trunc() as i64,
                max: DEFAULT_AREA_MAX,
            })
            .collect()
    }
}

/// Weighted aggregation of indicator points per principle and overall.
///
/// Missing principles, non-object indicators and missing numbers all count as
/// zero rather than failing the evaluation.
pub fn compute_scores(data: &Value) -> Scores {
    let mut principles = Vec::with_capacity(PRINCIPLES.len());
    let mut total_points = 0.0;
    let mut total_weight = 0.0;

    for dim in PRINCIPLES {
        let mut points_sum = 0.0;
        let mut weight_sum = 0.0;
        let mut indicators = Vec::new();

        if let Some(items) = data.get(dim).and_then(Value::as_object) {
            for (key, test) in items {
                let Some(test) = test.as_object() else {
                    continue;
                };
                let points = number(test.get("points"));
                let weight = number(test.get("score").and_then(|s| s.get("weight")));
                let name = non_empty_str(test.get("name")).unwrap_or(key).to_string();
                let name_smart = non_empty_str(test.get("name_smart"))
                    .unwrap_or(&name)
                    .to_string();
                let color = non_empty_str(test.get("color"))
                    .unwrap_or_else(|| colour_for(points))
                    .to_string();
                indicators.push(Indicator {
                    id: key.clone(),
                    name,
                    name_smart,
                    points,
                    weight,
                    color,
                    test_status: test
                        .get("test_status")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    messages: messages(test.get("msg")),
                });
                points_sum += points * weight;
                weight_sum += weight;
            }
        }

        let result_points = if weight_sum > 0.0 {
            round2(points_sum / weight_sum)
        } else {
            0.0
        };
        principles.push(Principle {
            name: dim.to_string(),
            indicators,
            result: PrincipleResult {
                points: result_points,
                color: colour_for(result_points).to_string(),
            },
        });
        total_points += points_sum;
        total_weight += weight_sum;
    }

    let fair_points = if total_weight > 0.0 {
        round2(total_points / total_weight)
    } else {
        0.0
    };
    Scores {
        principles,
        fair_color: colour_for(fair_points).to_string(),
        fair_points,
    }
}

fn number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn messages(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|m| match m {
                Value::String(s) => s.clone(),
                other => other
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
