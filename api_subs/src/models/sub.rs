use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const STATUS_TRIALING: &str = "trialing";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_CANCELED: &str = "canceled";

/// A user's billing relationship as reported by the backend.
///
/// `status` and `plan` stay plain strings: the backend may add statuses at
/// any time and unknown values must not break deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plan: String,
    #[serde(default)]
    pub trial_start: Option<RawTimestamp>,
    #[serde(default)]
    pub trial_end: Option<RawTimestamp>,
    #[serde(default)]
    pub current_period_start: Option<RawTimestamp>,
    #[serde(default)]
    pub current_period_end: Option<RawTimestamp>,
    #[serde(default)]
    pub cancel_at_period_end: Option<bool>,
    #[serde(default)]
    pub canceled_at: Option<RawTimestamp>,
}

impl Subscription {
    pub fn trial_end_at(&self) -> Option<DateTime<Utc>> {
        self.trial_end.as_ref().and_then(RawTimestamp::to_utc)
    }

    pub fn current_period_end_at(&self) -> Option<DateTime<Utc>> {
        self.current_period_end.as_ref().and_then(RawTimestamp::to_utc)
    }

    /// True only when the flag is explicitly set.
    pub fn cancel_requested(&self) -> bool {
        self.cancel_at_period_end == Some(true)
    }
}

/// A timestamp exactly as it arrived on the wire.
///
/// Numbers are epoch milliseconds, strings are ISO-8601. Anything else is
/// kept so the record still deserializes, and reads as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
    Other(serde_json::Value),
}

impl RawTimestamp {
    /// Resolves to an instant, or `None` when the value is malformed.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            RawTimestamp::Text(text) => parse_timestamp(text),
            RawTimestamp::Other(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        RawTimestamp::Text(value.to_rfc3339())
    }
}

/// Lenient ISO-8601 parsing: full RFC 3339, then a naive date-time, then a
/// bare date. Naive values are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
