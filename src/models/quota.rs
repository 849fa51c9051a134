use serde::Serialize;
use serde_json::{json, Map, Value};

const POST_CAP: &str = "threads_post_cap_quota";
const VIDEO_CAP: &str = "threads_video_post_cap_quota";

/// Publishing allowance as reported by `/me/threads/config`, with the remaining counts derived.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaSnapshot {
    pub quota: Value,
    pub usage: Value,
    /// `null` when the remote omits the cap; the gap is passed on, not papered over.
    pub remaining_posts: Value,
    pub remaining_video_posts: Value,
}

impl QuotaSnapshot {
    pub fn from_remote(body: &Value) -> Self {
        let quota = body
            .get("config")
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let usage = body
            .get("quota_usage")
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        Self {
            remaining_posts: remaining(quota.get(POST_CAP), usage.get(POST_CAP)),
            remaining_video_posts: remaining(quota.get(VIDEO_CAP), usage.get(VIDEO_CAP)),
            quota,
            usage,
        }
    }
}

/// `cap - used`, where a missing usage counts as zero and a missing cap yields `null`.
fn remaining(cap: Option<&Value>, used: Option<&Value>) -> Value {
    let used = used.filter(|v| !v.is_null());
    match (cap.and_then(Value::as_i64), used.map(Value::as_i64)) {
        (Some(c), None) => json!(c),
        (Some(c), Some(Some(u))) if c.checked_sub(u).is_some() => json!(c - u),
        _ => match (cap.and_then(Value::as_f64), used.map(Value::as_f64)) {
            (Some(c), None) => json!(c),
            (Some(c), Some(Some(u))) => json!(c - u),
            _ => Value::Null,
        },
    }
}
