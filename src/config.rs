//! Runtime configuration

use crate::chart::Canvas;
use crate::error::{Error, Result};
use std::path::PathBuf;
use url::Url;

/// Endpoint used when neither `--endpoint` nor `PROFILE_DASH_ENDPOINT` is set
pub const DEFAULT_ENDPOINT: &str = "https://learn.reboot01.com/api";

/// Default session lifetime in days
pub const DEFAULT_SESSION_DAYS: i64 = 7;

/// Upper bound accepted for `--session-days`
pub const MAX_SESSION_DAYS: i64 = 3650;

const SIGNIN_PATH: &str = "auth/signin";
const EXPIRE_PATH: &str = "auth/expire";
const SIGNOUT_PATH: &str = "auth/signout";
const GRAPHQL_PATH: &str = "graphql-engine/v1/graphql";

/// Dashboard configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL of the API (auth and GraphQL paths hang off it)
    pub endpoint: Url,
    /// File holding the persisted session token
    pub session_file: PathBuf,
    /// How long a saved token stays valid
    pub session_ttl: chrono::Duration,
    /// Output directory for the rendered profile page
    pub output_dir: PathBuf,
    /// Page title
    pub title: String,
    /// Canvas of the cumulative XP chart
    pub xp_canvas: Canvas,
    /// Canvas of the pass/fail chart
    pub audit_canvas: Canvas,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            session_file: default_session_file(),
            session_ttl: chrono::Duration::days(DEFAULT_SESSION_DAYS),
            output_dir: PathBuf::from("profile"),
            title: "Profile".to_string(),
            xp_canvas: Canvas::new(600.0, 300.0),
            audit_canvas: Canvas::new(300.0, 300.0),
        }
    }
}

impl DashboardConfig {
    /// Build a config for the given endpoint, keeping every other default
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            ..Default::default()
        })
    }

    pub fn signin_url(&self) -> Result<Url> {
        self.endpoint_url(SIGNIN_PATH)
    }

    pub fn expire_url(&self) -> Result<Url> {
        self.endpoint_url(EXPIRE_PATH)
    }

    pub fn signout_url(&self) -> Result<Url> {
        self.endpoint_url(SIGNOUT_PATH)
    }

    pub fn graphql_url(&self) -> Result<Url> {
        self.endpoint_url(GRAPHQL_PATH)
    }

    /// Resolve a path below the endpoint, keeping the endpoint's own path
    fn endpoint_url(&self, path: &str) -> Result<Url> {
        let mut base = self.endpoint.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path)?)
    }
}

/// Parse and validate an endpoint base URL
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::ConfigError(format!(
            "Endpoint must be http or https, got '{}'",
            other
        ))),
    }
}

/// `<config dir>/profile-dash/session.json`, or the working directory when
/// the platform has no config dir
pub fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("profile-dash")
        .join("session.json")
}
