//! Service account authentication for Google APIs
//!
//! Implements the OAuth 2.0 JWT bearer flow used by Google service accounts:
//! a JWT signed with the account's private key is exchanged at the key's
//! `token_uri` for a short-lived access token.

use anyhow::{Context, Result, bail};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::constants::{DATASTORE_SCOPE, DEFAULT_TOKEN_URI, JWT_BEARER_GRANT, TOKEN_LIFETIME_SECS};

/// Contents of a service account JSON key file
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credential file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid credential file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let key: ServiceAccountKey =
            serde_json::from_str(json).context("Failed to parse service account JSON")?;

        if key.key_type != "service_account" {
            bail!(
                "Expected a service account key (type \"service_account\"), got \"{}\"",
                key.key_type
            );
        }
        if key.project_id.is_empty() {
            bail!("Service account key has an empty project_id");
        }

        Ok(key)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Build the signed JWT assertion for the token request
pub fn build_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let claims = Claims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + TOKEN_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("Service account private_key is not a valid RSA PEM key")?;

    jsonwebtoken::encode(&header, &claims, &encoding_key).context("Failed to sign JWT assertion")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Bearer token for API requests
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<i64>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchange a signed assertion for an access token
pub async fn fetch_access_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
) -> Result<AccessToken> {
    let assertion = build_assertion(key, chrono::Utc::now().timestamp())?;

    log::debug!("Requesting access token for {} from {}", key.client_email, key.token_uri);

    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .with_context(|| format!("Failed to reach token endpoint: {}", key.token_uri))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!(
            "Authentication failed for {} (HTTP {}): {}",
            key.client_email,
            status.as_u16(),
            body
        );
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    log::info!("Authenticated as {}", key.client_email);

    Ok(AccessToken {
        token: token.access_token,
        expires_in: token.expires_in,
    })
}
