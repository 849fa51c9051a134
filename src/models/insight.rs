use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metrics asked for when the caller does not name any.
pub const DEFAULT_METRICS: &str = "views,likes,comments,quotes";

/// One named metric with its time-bucketed values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub values: Vec<InsightValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightValue {
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Insight {
    /// First bucket of this metric as a count.
    ///
    /// Zero, null and non-numeric values all read as absent, so callers can fall
    /// back to another source (e.g. a post's `like_count`).
    pub fn first_count(&self) -> Option<u64> {
        let value = &self.values.first()?.value;
        let n = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }?;
        (n > 0).then_some(n)
    }
}

/// Look up a metric by name and read its first bucket.
pub fn metric(insights: &[Insight], name: &str) -> Option<u64> {
    insights.iter().find(|i| i.name == name)?.first_count()
}

/// The remote API answers either `{ "data": [...] }` or a bare array; both become the array.
/// Anything else is treated as no insights.
pub fn normalize(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}
