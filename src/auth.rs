//! Sign-in and remote session termination

use crate::config::DashboardConfig;
use crate::credentials::SessionToken;
use crate::error::{Error, Result};
use crate::session::SessionTerminator;
use tracing::{debug, info, warn};
use url::Url;

/// Client for the `auth/*` endpoints
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    signin_url: Url,
    expire_url: Url,
    signout_url: Url,
}

impl AuthClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("profile-dash/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            signin_url: config.signin_url()?,
            expire_url: config.expire_url()?,
            signout_url: config.signout_url()?,
        })
    }

    /// Exchange username/password (or email/password) for a session token
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<SessionToken> {
        info!("Signing in as {}", username);

        let response = self
            .client
            .post(self.signin_url.clone())
            .basic_auth(username, Some(password))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                "Invalid credentials".to_string()
            } else {
                body.trim().to_string()
            };
            return Err(Error::SignIn {
                status: status.as_u16(),
                message,
            });
        }

        decode_token(&body).ok_or_else(|| Error::SignIn {
            status: status.as_u16(),
            message: "sign-in succeeded but no token was returned".to_string(),
        })
    }

    async fn notify(&self, request: reqwest::RequestBuilder, token: &SessionToken) -> Result<()> {
        request
            .bearer_auth(token.as_str())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl SessionTerminator for AuthClient {
    async fn terminate(&self, token: &SessionToken) -> Result<()> {
        debug!("Expiring session at {}", self.expire_url);
        let expire = self.notify(self.client.get(self.expire_url.clone()), token).await;

        debug!("Signing out at {}", self.signout_url);
        let signout = self.notify(self.client.post(self.signout_url.clone()), token).await;

        match (expire, signout) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(expire_err), Err(signout_err)) => {
                warn!("Session expire call failed: {}", expire_err);
                Err(signout_err)
            }
        }
    }
}

/// Decode a sign-in response body.
///
/// Some endpoint revisions return the raw JWT, others a JSON-quoted string.
pub fn decode_token(body: &str) -> Option<SessionToken> {
    let trimmed = body.trim();

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(token)) => SessionToken::new(token),
        _ => SessionToken::new(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_raw_token() {
        let token = decode_token("eyJhbGciOiJIUzI1NiJ9.payload.sig\n").unwrap();
        assert_eq!(token.as_str(), "eyJhbGciOiJIUzI1NiJ9.payload.sig");
    }

    #[test]
    fn test_decode_json_quoted_token() {
        let token = decode_token(r#""eyJhbGciOiJIUzI1NiJ9.payload.sig""#).unwrap();
        assert_eq!(token.as_str(), "eyJhbGciOiJIUzI1NiJ9.payload.sig");
    }

    #[test]
    fn test_decode_empty_token() {
        assert!(decode_token("").is_none());
        assert!(decode_token(r#""""#).is_none());
        assert!(decode_token("   ").is_none());
    }
}
