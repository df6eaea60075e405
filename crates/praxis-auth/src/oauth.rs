//! OAuth 2.0 authorization-code flow against the calendar provider.

use chrono::{DateTime, Duration, Utc};
use praxis_config::CalendarConfig;
use serde::Deserialize;

use crate::error::AuthError;

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    /// Only returned on the first consent (or with `prompt=consent`).
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

const fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in)
    }
}

/// URL the doctor is sent to for consent. Requests offline access so a
/// refresh token comes back.
#[must_use]
pub fn authorization_url(config: &CalendarConfig, redirect_url: &str, state: &str) -> String {
    format!(
        "{base}?response_type=code&client_id={client}&redirect_uri={redirect}&scope={scope}&state={state}&access_type=offline&prompt=consent",
        base = config.auth_url,
        client = urlencoding::encode(&config.client_id),
        redirect = urlencoding::encode(redirect_url),
        scope = urlencoding::encode(&config.scope),
        state = urlencoding::encode(state),
    )
}

/// Trade an authorization code for tokens.
///
/// # Errors
///
/// Returns `AuthError::OAuth` on transport failures, non-2xx responses, or
/// unparseable bodies.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &CalendarConfig,
    redirect_url: &str,
    code: &str,
) -> Result<TokenResponse, AuthError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_url),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];
    post_token_form(client, &config.token_url, &form, "exchange code").await
}

/// Obtain a fresh access token. Providers usually omit `refresh_token` here;
/// callers keep the one they already have.
///
/// # Errors
///
/// Returns `AuthError::OAuth` on transport failures, non-2xx responses, or
/// unparseable bodies.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    config: &CalendarConfig,
    refresh_token: &str,
) -> Result<TokenResponse, AuthError> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];
    post_token_form(client, &config.token_url, &form, "refresh token").await
}

async fn post_token_form(
    client: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
    step: &str,
) -> Result<TokenResponse, AuthError> {
    let resp = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| AuthError::OAuth(format!("{step}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(%status, step, "token endpoint rejected request");
        return Err(AuthError::OAuth(format!("{step}: HTTP {status}: {body}")));
    }

    resp.json::<TokenResponse>()
        .await
        .map_err(|e| AuthError::OAuth(format!("{step}: invalid token response: {e}")))
}
