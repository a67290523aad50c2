//! Profile metrics aggregation
//!
//! Resolves the user's identity first, then fetches XP total, XP history,
//! audits and recent activity concurrently. Only the identity step is
//! fatal; every other section degrades to [`Section::Failed`].

use crate::credentials::SessionToken;
use crate::data::{value_as_f64, AuditRecord, ProjectActivityEntry, UserProfile, XpSample};
use crate::error::{Error, Result};
use crate::format::{format_audit_ratio, format_audit_summary, format_magnitude};
use crate::graphql::QueryExecutor;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Number of activity rows shown on the profile
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

pub const PROFILE_QUERY: &str = r#"
query Profile {
  user {
    id
    login
    auditRatio
    totalUp
    totalDown
  }
}"#;

pub fn xp_total_query(user_id: i64) -> String {
    format!(
        r#"
query XpTotal {{
  transaction_aggregate(where: {{userId: {{_eq: {user_id}}}, type: {{_eq: "xp"}}}}) {{
    aggregate {{
      sum {{
        amount
      }}
    }}
  }}
}}"#
    )
}

pub fn xp_transactions_query(user_id: i64) -> String {
    format!(
        r#"
query XpTransactions {{
  transaction(where: {{userId: {{_eq: {user_id}}}, type: {{_eq: "xp"}}}}, order_by: {{createdAt: asc}}) {{
    amount
    createdAt
  }}
}}"#
    )
}

pub fn audits_query(user_id: i64) -> String {
    format!(
        r#"
query Audits {{
  audit(where: {{auditorId: {{_eq: {user_id}}}, grade: {{_is_null: false}}}}, order_by: {{createdAt: asc}}) {{
    grade
    createdAt
  }}
}}"#
    )
}

pub fn recent_activity_query(user_id: i64) -> String {
    format!(
        r#"
query RecentActivity {{
  transaction(where: {{userId: {{_eq: {user_id}}}, type: {{_eq: "xp"}}}}, order_by: {{createdAt: desc}}, limit: {limit}) {{
    createdAt
    object {{
      name
      type
    }}
  }}
}}"#,
        limit = RECENT_ACTIVITY_LIMIT
    )
}

/// Outcome of one independently fetched region of the profile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Failed(String),
}

impl<T> Section<T> {
    fn from_result(name: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Section::Ready(value),
            Err(e) => {
                warn!("{} unavailable: {}", name, e);
                Section::Failed(e.to_string())
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            Section::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Section::Ready(_) => None,
            Section::Failed(message) => Some(message),
        }
    }
}

/// Display-ready profile
#[derive(Debug, Clone, Serialize)]
pub struct ProfileViewModel {
    pub user: UserProfile,
    /// Total XP, e.g. `"2.30 MB"`
    pub xp_display: Section<String>,
    /// Audit ratio to one decimal, or `"Infinity"`
    pub audit_ratio_display: String,
    /// Ratio plus done/received totals
    pub audit_summary: String,
    pub xp_series: Section<Vec<XpSample>>,
    pub audit_series: Section<Vec<AuditRecord>>,
    pub recent_activity: Section<Vec<ProjectActivityEntry>>,
}

impl ProfileViewModel {
    pub fn login(&self) -> &str {
        &self.user.login
    }

    /// XP history for the line chart; empty when the section failed
    pub fn xp_samples(&self) -> &[XpSample] {
        self.xp_series.ready().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Audits for the pie chart; empty when the section failed
    pub fn audit_records(&self) -> &[AuditRecord] {
        self.audit_series.ready().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn activity(&self) -> &[ProjectActivityEntry] {
        self.recent_activity.ready().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Runs the profile queries through a [`QueryExecutor`]
#[derive(Debug, Clone)]
pub struct MetricsAggregator<E> {
    executor: E,
}

impl<E: QueryExecutor> MetricsAggregator<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Load and shape everything the profile page shows.
    ///
    /// Fails only when the user identity cannot be resolved.
    pub async fn load_profile(&self, token: &SessionToken) -> Result<ProfileViewModel> {
        info!("Loading profile data");

        let user = parse_user(&self.query(PROFILE_QUERY, token).await?)?;
        debug!("Resolved user {} ({})", user.login, user.id);

        let (xp_total, xp_series, audit_series, recent_activity) = tokio::join!(
            self.fetch_xp_total(user.id, token),
            self.fetch_xp_transactions(user.id, token),
            self.fetch_audits(user.id, token),
            self.fetch_recent_activity(user.id, token),
        );

        let view = ProfileViewModel {
            xp_display: Section::from_result(
                "XP total",
                xp_total.map(|total| format_magnitude(Some(total))),
            ),
            audit_ratio_display: format_audit_ratio(user.audit_ratio, user.total_up, user.total_down),
            audit_summary: format_audit_summary(user.audit_ratio, user.total_up, user.total_down),
            xp_series: Section::from_result("XP history", xp_series),
            audit_series: Section::from_result("Audit history", audit_series),
            recent_activity: Section::from_result("Recent activity", recent_activity),
            user,
        };

        info!(
            "Loaded profile: {} XP samples, {} audits, {} activity entries",
            view.xp_samples().len(),
            view.audit_records().len(),
            view.activity().len()
        );

        Ok(view)
    }

    async fn query(&self, query: &str, token: &SessionToken) -> Result<Value> {
        Ok(self.executor.execute(query, token).await?)
    }

    async fn fetch_xp_total(&self, user_id: i64, token: &SessionToken) -> Result<f64> {
        let data = self.query(&xp_total_query(user_id), token).await?;
        Ok(parse_xp_total(&data))
    }

    async fn fetch_xp_transactions(&self, user_id: i64, token: &SessionToken) -> Result<Vec<XpSample>> {
        let data = self.query(&xp_transactions_query(user_id), token).await?;
        parse_list(&data, "transaction")
    }

    async fn fetch_audits(&self, user_id: i64, token: &SessionToken) -> Result<Vec<AuditRecord>> {
        let data = self.query(&audits_query(user_id), token).await?;
        parse_list(&data, "audit")
    }

    async fn fetch_recent_activity(
        &self,
        user_id: i64,
        token: &SessionToken,
    ) -> Result<Vec<ProjectActivityEntry>> {
        let data = self.query(&recent_activity_query(user_id), token).await?;
        parse_activity(&data)
    }
}

/// First row of `user`, with an integer id
pub fn parse_user(data: &Value) -> Result<UserProfile> {
    let user = data
        .get("user")
        .and_then(Value::as_array)
        .and_then(|users| users.first())
        .ok_or_else(|| Error::DataShape("user not found in response".to_string()))?;

    let id = match user.get("id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::DataShape(format!("user id is not an integer: {}", user["id"])))?;

    Ok(UserProfile {
        id,
        login: user
            .get("login")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
            .unwrap_or("N/A")
            .to_string(),
        audit_ratio: user.get("auditRatio").and_then(value_as_f64),
        total_up: user.get("totalUp").and_then(value_as_f64).unwrap_or(0.0),
        total_down: user.get("totalDown").and_then(value_as_f64).unwrap_or(0.0),
    })
}

/// Aggregate XP sum; absent or null counts as zero
pub fn parse_xp_total(data: &Value) -> f64 {
    data.pointer("/transaction_aggregate/aggregate/sum/amount")
        .and_then(value_as_f64)
        .unwrap_or(0.0)
}

/// Deserialize the list under `key`; `null` reads as empty
fn parse_list<T: serde::de::DeserializeOwned>(data: &Value, key: &str) -> Result<Vec<T>> {
    match data.get(key) {
        None => Err(Error::DataShape(format!("'{}' missing from response", key))),
        Some(Value::Null) => Ok(Vec::new()),
        Some(list) => Ok(serde_json::from_value(list.clone())?),
    }
}

/// Recent activity rows; the `transaction` key must be present
pub fn parse_activity(data: &Value) -> Result<Vec<ProjectActivityEntry>> {
    let rows = data
        .get("transaction")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::DataShape("'transaction' missing from activity response".to_string()))?;

    Ok(rows
        .iter()
        .map(|row| {
            let object = row.get("object");
            let field = |v: Option<&Value>| v.and_then(Value::as_str).unwrap_or_default().to_string();

            ProjectActivityEntry {
                kind: field(object.and_then(|o| o.get("type"))),
                name: field(object.and_then(|o| o.get("name"))),
                created_at: field(row.get("createdAt")),
            }
        })
        .collect())
}
