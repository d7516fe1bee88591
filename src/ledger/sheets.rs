//! Google Sheets v4 implementation of the ledger gateway

use super::{LedgerGateway, LedgerRow, PersistenceError, RowField, SheetRow};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for signed assertions; Google caps it at an hour
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh cached tokens this long before they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where OAuth bearer tokens for the Sheets API come from
pub enum TokenSource {
    /// A token supplied by the environment
    Static(String),
    /// The GCE metadata server of the attached service account
    Metadata {
        url: String,
        cached: Mutex<Option<CachedToken>>,
    },
    /// A service-account key exchanged for tokens at the OAuth endpoint
    ServiceAccount {
        account: ServiceAccount,
        cached: Mutex<Option<CachedToken>>,
    },
}

pub struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Signing identity for the JWT bearer grant
pub struct ServiceAccount {
    email: String,
    key: EncodingKey,
    token_url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

impl ServiceAccount {
    /// `private_key` is a PEM block, or base64 of one, with `\n` escapes allowed
    pub fn new(
        email: impl Into<String>,
        private_key: &str,
        token_url: impl Into<String>,
    ) -> Result<Self, PersistenceError> {
        let pem = decode_private_key(private_key)?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| PersistenceError::auth(format!("Invalid service account key: {e}")))?;
        Ok(Self {
            email: email.into(),
            key,
            token_url: token_url.into(),
        })
    }

    fn assertion(&self, issued_at: i64) -> Result<String, PersistenceError> {
        let claims = AssertionClaims {
            iss: self.email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.token_url.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| PersistenceError::auth(format!("Failed to sign assertion: {e}")))
    }

    fn token_request(&self, client: &Client) -> Result<reqwest::RequestBuilder, PersistenceError> {
        let assertion = self.assertion(Utc::now().timestamp())?;
        Ok(client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())]))
    }
}

/// Base64 unless it already reads as PEM, then unescape literal `\n`
fn decode_private_key(raw: &str) -> Result<String, PersistenceError> {
    let raw = raw.trim();
    let pem = if raw.contains("PRIVATE KEY") {
        raw.to_string()
    } else {
        let bytes = BASE64
            .decode(raw)
            .map_err(|e| PersistenceError::auth(format!("Private key is neither PEM nor base64: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| PersistenceError::auth(format!("Private key is not UTF-8: {e}")))?
    };
    Ok(pem.replace("\\n", "\n"))
}

impl TokenSource {
    pub fn metadata(url: impl Into<String>) -> Self {
        TokenSource::Metadata {
            url: url.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn service_account(account: ServiceAccount) -> Self {
        TokenSource::ServiceAccount {
            account,
            cached: Mutex::new(None),
        }
    }

    async fn bearer(&self, client: &Client) -> Result<String, PersistenceError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata { url, cached } => {
                let request = client.get(url).header("Metadata-Flavor", "Google");
                cached_or_fetch(cached, request).await
            }
            TokenSource::ServiceAccount { account, cached } => {
                let mut guard = cached.lock().await;
                if let Some(token) = fresh(guard.as_ref()) {
                    return Ok(token);
                }
                tracing::debug!(account = %account.email, "Exchanging service account assertion");
                let request = account.token_request(client)?;
                fetch_into(&mut guard, request).await
            }
        }
    }
}

fn fresh(cached: Option<&CachedToken>) -> Option<String> {
    cached
        .filter(|token| Instant::now() < token.expires_at)
        .map(|token| token.token.clone())
}

async fn cached_or_fetch(
    cached: &Mutex<Option<CachedToken>>,
    request: reqwest::RequestBuilder,
) -> Result<String, PersistenceError> {
    let mut guard = cached.lock().await;
    if let Some(token) = fresh(guard.as_ref()) {
        return Ok(token);
    }
    fetch_into(&mut guard, request).await
}

/// Run a token request and cache the answer, minus the expiry margin
async fn fetch_into(
    slot: &mut Option<CachedToken>,
    request: reqwest::RequestBuilder,
) -> Result<String, PersistenceError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PersistenceError::auth(format!(
            "Token request failed ({status}): {body}"
        )));
    }
    let parsed: TokenResponse = response.json().await?;
    let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
    *slot = Some(CachedToken {
        token: parsed.access_token.clone(),
        expires_at: Instant::now() + lifetime,
    });
    Ok(parsed.access_token)
}

/// Connection settings for one spreadsheet tab
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_base: String,
    pub spreadsheet_id: String,
    /// Tab holding the ledger, e.g. `Transactions`
    pub tab: String,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

/// Ledger stored in a Google spreadsheet tab, columns A through G
pub struct GoogleSheetsGateway {
    client: Client,
    config: SheetsConfig,
    tokens: TokenSource,
    /// Numeric id of the tab, needed for row deletion
    sheet_id: OnceCell<i64>,
}

impl GoogleSheetsGateway {
    pub fn new(config: SheetsConfig, tokens: TokenSource) -> Result<Self, PersistenceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PersistenceError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            tokens,
            sheet_id: OnceCell::new(),
        })
    }

    fn url(&self, tail: &[&str]) -> Result<Url, PersistenceError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| PersistenceError::invalid_request(format!("Bad API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| PersistenceError::invalid_request("API base cannot hold a path"))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(tail);
        Ok(url)
    }

    fn full_range(&self) -> String {
        format!("{}!A:G", self.config.tab)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PersistenceError> {
        let token = self.tokens.bearer(&self.client).await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PersistenceError::from_status(status.as_u16(), &body))
        }
    }

    async fn tab_id(&self) -> Result<i64, PersistenceError> {
        self.sheet_id
            .get_or_try_init(|| async {
                let mut url = self.url(&[&self.config.spreadsheet_id])?;
                url.query_pairs_mut()
                    .append_pair("fields", "sheets.properties(sheetId,title)");
                let meta: SpreadsheetMeta = self.send(self.client.get(url)).await?.json().await?;
                let id = meta
                    .sheets
                    .into_iter()
                    .find(|s| s.properties.title == self.config.tab)
                    .map_or(0, |s| s.properties.sheet_id);
                tracing::debug!(tab = %self.config.tab, sheet_id = id, "Resolved sheet id");
                Ok(id)
            })
            .await
            .copied()
    }
}

/// Sheets returns numbers for unformatted cells; everything else is text
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl LedgerGateway for GoogleSheetsGateway {
    async fn append_batch(&self, rows: &[LedgerRow]) -> Result<(), PersistenceError> {
        let values: Vec<[String; 7]> = rows.iter().map(LedgerRow::to_cells).collect();
        let range = format!("{}:append", self.full_range());
        let mut url = self.url(&[&self.config.spreadsheet_id, "values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        self.send(self.client.post(url).json(&json!({ "values": values })))
            .await?;
        tracing::info!(rows = rows.len(), "Rows appended to sheet");
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        let range = self.full_range();
        let url = self.url(&[&self.config.spreadsheet_id, "values", &range])?;
        let body: ValueRange = self.send(self.client.get(url)).await?.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn update_cell(
        &self,
        position: usize,
        field: RowField,
        value: &str,
    ) -> Result<(), PersistenceError> {
        let range = format!("{}!{}{}", self.config.tab, field.column(), position);
        let mut url = self.url(&[&self.config.spreadsheet_id, "values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        self.send(
            self.client
                .put(url)
                .json(&json!({ "range": range, "values": [[value]] })),
        )
        .await?;
        Ok(())
    }

    async fn delete_row(&self, position: usize) -> Result<(), PersistenceError> {
        if position < 2 {
            return Err(PersistenceError::invalid_request(
                "Refusing to delete the header row",
            ));
        }
        let sheet_id = self.tab_id().await?;
        let batch = format!("{}:batchUpdate", self.config.spreadsheet_id);
        let url = self.url(&[&batch])?;
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": position - 1,
                        "endIndex": position,
                    }
                }
            }]
        });

        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}
