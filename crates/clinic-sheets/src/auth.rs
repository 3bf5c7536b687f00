//! # Service-Account Authentication
//!
//! Exchanges a signed service-account grant for an OAuth access token and
//! caches it until shortly before expiry.
//!
//! ## Token Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Service-Account Token Flow                           │
//! │                                                                         │
//! │  ┌────────────────┐                      ┌─────────────────────────┐   │
//! │  │ clinic-sheets  │                      │ oauth2.googleapis.com   │   │
//! │  └───────┬────────┘                      └────────────┬────────────┘   │
//! │          │                                            │                │
//! │          │  1. Sign JWT (RS256, private key)          │                │
//! │          │     iss=client_email scope=spreadsheets    │                │
//! │          │                                            │                │
//! │          │  2. POST /token (jwt-bearer assertion)     │                │
//! │          │───────────────────────────────────────────►│                │
//! │          │  3. access_token, expires_in               │                │
//! │          │◄───────────────────────────────────────────│                │
//! │          │                                            │                │
//! │          │  [Cached until 5 minutes before expiry]    │                │
//! │          │                                            │                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache sits behind a `tokio::sync::Mutex` so concurrent requests that
//! find it stale trigger one exchange, not one each.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{SheetsError, SheetsResult};

/// Google's OAuth token endpoint.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Lifetime requested for each grant (Google's maximum).
const GRANT_LIFETIME_SECS: i64 = 3600;

/// Margin before expiry at which the token is replaced.
const REFRESH_MARGIN_SECS: i64 = 300;

// =============================================================================
// Service Account
// =============================================================================

/// Credentials of a Google service account.
#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
}

impl ServiceAccount {
    /// Builds credentials, turning literal `\n` sequences in the key into
    /// newlines (environment variables usually carry the key on one line).
    pub fn new(client_email: impl Into<String>, private_key: impl AsRef<str>) -> Self {
        ServiceAccount {
            client_email: client_email.into(),
            private_key: private_key.as_ref().replace("\\n", "\n"),
        }
    }
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Token Cache
// =============================================================================

#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

/// Hands out valid access tokens for one service account.
pub struct TokenProvider {
    account: ServiceAccount,
    key: EncodingKey,
    client: reqwest::Client,
    token_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Parses the private key up front so a bad key fails at startup.
    pub fn new(account: ServiceAccount, client: reqwest::Client) -> SheetsResult<Self> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| SheetsError::Auth(format!("invalid service-account private key: {e}")))?;

        Ok(TokenProvider {
            account,
            key,
            client,
            token_url: TOKEN_URL.to_string(),
            cached: Mutex::new(None),
        })
    }

    /// Overrides the token endpoint (for a local emulator).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn client_email(&self) -> &str {
        &self.account.client_email
    }

    /// Returns a cached token, exchanging a new grant when it is stale.
    pub async fn access_token(&self) -> SheetsResult<String> {
        let mut guard = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = guard.as_ref() {
            if !token.needs_refresh(now) {
                return Ok(token.access_token.clone());
            }
            debug!("Access token near expiry, refreshing");
        }

        let token = self.exchange(now).await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    /// Signs the RS256 assertion sent to the token endpoint.
    fn signed_grant(&self, now: DateTime<Utc>) -> SheetsResult<String> {
        let claims = GrantClaims {
            iss: &self.account.client_email,
            scope: SHEETS_SCOPE,
            aud: TOKEN_URL,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(GRANT_LIFETIME_SECS)).timestamp(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| SheetsError::Auth(format!("failed to sign grant: {e}")))
    }

    async fn exchange(&self, now: DateTime<Utc>) -> SheetsResult<CachedToken> {
        let assertion = self.signed_grant(now)?;

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        info!(
            client_email = %self.account.client_email,
            expires_in = token.expires_in,
            "Obtained Google access token"
        );

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("client_email", &self.account.client_email)
            .field("token_url", &self.token_url)
            .finish()
    }
}
