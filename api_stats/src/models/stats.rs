use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Aggregate dashboard stats exactly as the backend returned them.
///
/// The body is kept as raw JSON and re-serialized untouched. The accessors
/// only read it; a counter that is missing or not an unsigned integer reads
/// as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsPayload(Value);

impl StatsPayload {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }

    /// Reads a top-level unsigned counter such as `totalBooks`.
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.0.get(name).and_then(Value::as_u64)
    }

    pub fn total_books(&self) -> Option<u64> {
        self.counter("totalBooks")
    }

    pub fn total_downloads(&self) -> Option<u64> {
        self.counter("totalDownloads")
    }

    pub fn total_views(&self) -> Option<u64> {
        self.counter("totalViews")
    }

    pub fn total_emails_captured(&self) -> Option<u64> {
        self.counter("totalEmailsCaptured")
    }
}

impl From<Value> for StatsPayload {
    fn from(body: Value) -> Self {
        Self(body)
    }
}
