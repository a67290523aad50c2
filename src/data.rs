//! Data structures for learner progress records

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identity and audit totals of the signed-in user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    /// Numeric user id used to scope the follow-up queries
    pub id: i64,
    /// Login name
    pub login: String,
    /// Precomputed audit ratio, when the service provides one
    pub audit_ratio: Option<f64>,
    /// Total amount earned by auditing others
    pub total_up: f64,
    /// Total amount received from being audited
    pub total_down: f64,
}

/// One XP-granting transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XpSample {
    /// XP granted
    #[serde(deserialize_with = "lenient_amount")]
    pub amount: f64,
    /// Raw creation timestamp as returned by the service; empty when absent
    #[serde(rename = "createdAt", default, deserialize_with = "lenient_timestamp")]
    pub created_at: String,
}

impl XpSample {
    pub fn new(amount: f64, created_at: impl Into<String>) -> Self {
        Self {
            amount,
            created_at: created_at.into(),
        }
    }

    /// Parsed timestamp, `None` when the raw value is not a date
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

/// A graded audit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    /// Grade; anything that is not a JSON number becomes `None`
    #[serde(default, deserialize_with = "numeric_or_none")]
    pub grade: Option<f64>,
    #[serde(rename = "createdAt", default, deserialize_with = "lenient_timestamp")]
    pub created_at: String,
}

impl AuditRecord {
    pub fn new(grade: Option<f64>, created_at: impl Into<String>) -> Self {
        Self {
            grade,
            created_at: created_at.into(),
        }
    }

    /// `Some(true)` for a pass, `Some(false)` for a fail, `None` when ungraded
    pub fn outcome(&self) -> Option<bool> {
        self.grade.filter(|g| !g.is_nan()).map(|g| g >= 1.0)
    }
}

/// A recent project event, shown as a text line
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectActivityEntry {
    /// Object type, e.g. `project` or `piscine_js`
    pub kind: String,
    /// Object name
    pub name: String,
    pub created_at: String,
}

impl ProjectActivityEntry {
    /// Display label such as `"Piscine Js: quest-01"`
    pub fn label(&self) -> String {
        crate::format::format_activity_label(&self.kind, &self.name)
    }
}

/// Parse a service timestamp.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) or a
/// bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Read a JSON number that may also arrive as a numeric string
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn numeric_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).unwrap_or(0.0))
}

// Null or non-string timestamps become "", which never parses as a date.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}
