//! Firestore REST client

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::auth::{ServiceAccountKey, fetch_access_token};
use super::constants::{
    DEFAULT_DATABASE, EMULATOR_HOST_ENV, EMULATOR_TOKEN, FIRESTORE_BASE_URL,
    REQUEST_TIMEOUT_SECS,
};
use super::store::{CreatedDocument, DocumentStore, document_body};

/// Where requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Google-hosted Firestore (or a stand-in with the same API), with
    /// service account authentication
    Remote { base_url: String },
    /// Local emulator; no token exchange
    Emulator { host: String },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Remote {
            base_url: FIRESTORE_BASE_URL.to_string(),
        }
    }
}

impl Endpoint {
    /// Emulator if `FIRESTORE_EMULATOR_HOST` is set, production otherwise
    pub fn from_env() -> Self {
        match std::env::var(EMULATOR_HOST_ENV) {
            Ok(host) if !host.trim().is_empty() => {
                log::info!("{} is set, using emulator at {}", EMULATOR_HOST_ENV, host);
                Endpoint::Emulator {
                    host: host.trim().to_string(),
                }
            }
            _ => Endpoint::default(),
        }
    }

    fn base_url(&self) -> String {
        match self {
            Endpoint::Remote { base_url } => base_url.trim_end_matches('/').to_string(),
            Endpoint::Emulator { host } => format!("http://{}", host.trim_end_matches('/')),
        }
    }
}

/// Connection settings besides the credential file
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: Endpoint,
    pub database: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

/// Response body of `createDocument`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentResponse {
    name: String,
    #[serde(default)]
    create_time: Option<String>,
}

/// Authenticated client for one Firestore database
pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    database: String,
    bearer: String,
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl FirestoreClient {
    /// Read the credential file and authenticate
    pub async fn from_credentials_file<P: AsRef<Path>>(
        path: P,
        options: &ClientOptions,
    ) -> Result<Self> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::connect(&key, options).await
    }

    pub async fn connect(key: &ServiceAccountKey, options: &ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        let bearer = match &options.endpoint {
            Endpoint::Remote { .. } => {
                let token = fetch_access_token(&http, key).await?;
                log::debug!("Access token expires in {:?}s", token.expires_in);
                token.token
            }
            Endpoint::Emulator { .. } => EMULATOR_TOKEN.to_string(),
        };

        Ok(Self {
            http,
            base_url: options.endpoint.base_url(),
            project_id: key.project_id.clone(),
            database: options.database.clone(),
            bearer,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            self.base_url,
            self.project_id,
            self.database,
            urlencoding::encode(collection)
        )
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn create_document(
        &self,
        collection: &str,
        fields: &[(String, String)],
    ) -> Result<CreatedDocument> {
        let url = self.collection_url(collection);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer)
            .json(&document_body(fields))
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "Failed to create document in '{}' (HTTP {}): {}",
                collection,
                status.as_u16(),
                body
            );
        }

        let document: DocumentResponse = response
            .json()
            .await
            .context("Failed to parse createDocument response")?;

        let id = document
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .with_context(|| format!("Unexpected document name: {}", document.name))?
            .to_string();

        log::debug!(
            "Created {} at {}",
            document.name,
            document.create_time.as_deref().unwrap_or("unknown time")
        );

        Ok(CreatedDocument {
            id,
            name: document.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::tests::test_key;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COLLECTION_PATH: &str = "/v1/projects/catalog-test/databases/(default)/documents/packages";

    fn remote(server: &MockServer) -> ClientOptions {
        ClientOptions {
            endpoint: Endpoint::Remote {
                base_url: server.uri(),
            },
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.test-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_connect_and_create_document() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path(COLLECTION_PATH))
            .and(header("authorization", "Bearer ya29.test-token"))
            .and(body_json(json!({
                "fields": {
                    "sku": { "stringValue": "A1" },
                    "qty": { "stringValue": "5" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/catalog-test/databases/(default)/documents/packages/Xk3f9",
                "fields": {
                    "sku": { "stringValue": "A1" },
                    "qty": { "stringValue": "5" }
                },
                "createTime": "2026-10-19T10:00:00Z",
                "updateTime": "2026-10-19T10:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let key = test_key(&format!("{}/token", server.uri()));
        let client = FirestoreClient::connect(&key, &remote(&server)).await.unwrap();
        assert_eq!(client.project_id(), "catalog-test");

        let fields = vec![
            ("sku".to_string(), "A1".to_string()),
            ("qty".to_string(), "5".to_string()),
        ];
        let created = client.create_document("packages", &fields).await.unwrap();

        assert_eq!(created.id, "Xk3f9");
        assert_eq!(
            created.name,
            "projects/catalog-test/databases/(default)/documents/packages/Xk3f9"
        );
    }

    #[tokio::test]
    async fn test_rejected_credentials_fail_connect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT Signature."
            })))
            .mount(&server)
            .await;

        let key = test_key(&format!("{}/token", server.uri()));
        let err = FirestoreClient::connect(&key, &remote(&server))
            .await
            .unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("Authentication failed"));
        assert!(message.contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_create_error_status() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path(COLLECTION_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let key = test_key(&format!("{}/token", server.uri()));
        let client = FirestoreClient::connect(&key, &remote(&server)).await.unwrap();
        let err = client
            .create_document("packages", &[("sku".to_string(), "A1".to_string())])
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("HTTP 403"));
        assert!(message.contains("PERMISSION_DENIED"));
    }

    #[tokio::test]
    async fn test_emulator_skips_token_exchange() {
        let server = MockServer::start().await;
        let host = server.uri().trim_start_matches("http://").to_string();

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(COLLECTION_PATH))
            .and(header("authorization", "Bearer owner"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/catalog-test/databases/(default)/documents/packages/emu1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let key = test_key(&format!("{}/token", server.uri()));
        let options = ClientOptions {
            endpoint: Endpoint::Emulator { host },
            database: DEFAULT_DATABASE.to_string(),
        };
        let client = FirestoreClient::connect(&key, &options).await.unwrap();
        let created = client
            .create_document("packages", &[("sku".to_string(), "A1".to_string())])
            .await
            .unwrap();

        assert_eq!(created.id, "emu1");
    }

    #[test]
    fn test_endpoint_base_url() {
        assert_eq!(Endpoint::default().base_url(), FIRESTORE_BASE_URL);
        assert_eq!(
            Endpoint::Emulator {
                host: "localhost:8080".to_string()
            }
            .base_url(),
            "http://localhost:8080"
        );
        assert_eq!(
            Endpoint::Remote {
                base_url: "http://127.0.0.1:9000/".to_string()
            }
            .base_url(),
            "http://127.0.0.1:9000"
        );
    }
}
