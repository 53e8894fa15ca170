// Hand-crafted async HTTP client for the users collection endpoint.
//
// Surface:
//   GET  /api/users[?q=<text>]   -> { "users": [User] }
//   POST /api/users              -> 2xx, body optional
//   PUT  /api/users?id=<i64>     -> { "upsert": "created" | "updated" }
//
// Failures are non-2xx responses carrying an optional { "message": ... }.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::Error;

/// A user record as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Which branch the server took for an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

// ── Wire envelopes ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct UsersEnvelope {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Deserialize)]
struct UpsertEnvelope {
    upsert: UpsertOutcome,
}

#[derive(Serialize)]
struct UserBody<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the users collection endpoint.
#[derive(Debug, Clone)]
pub struct UsersClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UsersClient {
    /// Build from a server base URL and transport config.
    pub fn new(base_url: &str, transport: &crate::TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn users_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join("/api/users")?)
    }

    // ── Operations ───────────────────────────────────────────────────

    /// List users, filtered server-side by `query`. An empty query lists
    /// the whole collection and sends no `q` parameter.
    pub async fn list(&self, query: &str) -> Result<Vec<User>, Error> {
        let mut url = self.users_url()?;
        if !query.is_empty() {
            url.query_pairs_mut().append_pair("q", query);
        }
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let envelope: UsersEnvelope = Self::decode(resp).await?;
        Ok(envelope.users)
    }

    /// Create a user. Any 2xx counts as success; the body is ignored.
    pub async fn create(&self, name: &str, email: &str) -> Result<(), Error> {
        let url = self.users_url()?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .json(&UserBody { name, email })
            .send()
            .await?;
        Self::expect_success(resp).await
    }

    /// Insert-or-update the user addressed by `id`. The server reports
    /// which branch it took.
    pub async fn upsert(&self, id: i64, name: &str, email: &str) -> Result<UpsertOutcome, Error> {
        let mut url = self.users_url()?;
        url.query_pairs_mut().append_pair("id", &id.to_string());
        debug!("PUT {url}");

        let resp = self
            .http
            .put(url)
            .json(&UserBody { name, email })
            .send()
            .await?;
        let envelope: UpsertEnvelope = Self::decode(resp).await?;
        Ok(envelope.upsert)
    }

    // ── Response handling ────────────────────────────────────────────

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::rejection(status, resp).await)
        }
    }

    async fn expect_success(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::rejection(status, resp).await)
        }
    }

    /// Parse a non-2xx response into `Error::Api`, preferring the
    /// server's `message`, falling back to the status text, then to the
    /// raw body.
    async fn rejection(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}
