// SPDX-License-Identifier: Apache-2.0

use crate::{SheetStoreBackend, StoreError, WorksheetFetch};
use async_trait::async_trait;
use insights_panel_model::SheetRow;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 120,
        }
    }
}

/// Reads `<root>/<title>.json`, an array of header-keyed objects. Used
/// for development and fixture tests.
pub struct LocalJsonBackend {
    root: PathBuf,
}

impl LocalJsonBackend {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl SheetStoreBackend for LocalJsonBackend {
    fn backend_tag(&self) -> &'static str {
        "localjson"
    }

    async fn fetch_worksheet(&self, title: &str) -> Result<WorksheetFetch, StoreError> {
        if title.contains('/') || title.contains('\\') || title.contains("..") {
            return Err(StoreError(format!(
                "worksheet title is not a valid file name: {title}"
            )));
        }
        let path = self.root.join(format!("{title}.json"));
        if !path.exists() {
            return Ok(WorksheetFetch::NotFound);
        }
        let bytes =
            std::fs::read(&path).map_err(|e| StoreError(format!("worksheet read failed: {e}")))?;
        let rows: Vec<serde_json::Map<String, Value>> = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError(format!("worksheet parse failed: {e}")))?;
        Ok(WorksheetFetch::Found(
            rows.iter().map(sheet_row_from_object).collect(),
        ))
    }
}

fn sheet_row_from_object(obj: &serde_json::Map<String, Value>) -> SheetRow {
    obj.iter().map(|(k, v)| (k.clone(), cell_text(v))).collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: u64 = 3600;
const TOKEN_EXPIRY_LEEWAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path)
            .map_err(|e| StoreError(format!("service account key read failed: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError(format!("service account key parse failed: {e}")))
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

struct CachedToken {
    bearer: String,
    expires_at: Instant,
}

/// Google Sheets values-API backend. Authenticates with a service
/// account: a short-lived RS256 assertion is exchanged at the key's
/// token endpoint for a bearer token, cached until near expiry. The key
/// file is read per mint so credential problems stay request-scoped.
pub struct GoogleSheetsBackend {
    spreadsheet_id: String,
    key_path: PathBuf,
    retry: RetryPolicy,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheetsBackend {
    #[must_use]
    pub fn new(spreadsheet_id: String, key_path: PathBuf, retry: RetryPolicy) -> Self {
        Self {
            spreadsheet_id,
            key_path,
            retry,
            token: Mutex::new(None),
        }
    }

    fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    }

    fn mint_assertion(&self, key: &ServiceAccountKey) -> Result<String, StoreError> {
        let now = unix_seconds();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StoreError(format!("service account private key invalid: {e}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| StoreError(format!("assertion signing failed: {e}")))
    }

    async fn bearer_token(&self) -> Result<String, StoreError> {
        let mut slot = self.token.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at.saturating_duration_since(Instant::now()) > TOKEN_EXPIRY_LEEWAY {
                return Ok(cached.bearer.clone());
            }
        }
        let key = ServiceAccountKey::from_file(&self.key_path)?;
        let assertion = self.mint_assertion(&key)?;
        let resp = self
            .client()
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| StoreError(format!("token exchange failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(StoreError(format!(
                "token exchange failed status={}",
                resp.status()
            )));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| StoreError(format!("token response parse failed: {e}")))?;
        let bearer = token.access_token.clone();
        *slot = Some(CachedToken {
            bearer: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(bearer)
    }

    fn values_url(&self, title: &str) -> String {
        format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            self.spreadsheet_id,
            percent_encode(title)
        )
    }

    #[instrument(name = "sheets_get_values_with_retry", skip(self, bearer))]
    async fn get_values_with_retry(
        &self,
        url: &str,
        bearer: &str,
    ) -> Result<WorksheetFetch, StoreError> {
        let client = self.client();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let req = client.get(url).bearer_auth(bearer);
            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let values: ValuesResponse = resp
                        .json()
                        .await
                        .map_err(|e| StoreError(format!("values parse failed: {e}")))?;
                    return Ok(WorksheetFetch::Found(rows_from_values(&values.values)));
                }
                // The values API reports an unknown worksheet title as an
                // unparseable range (400) rather than a 404.
                Ok(resp) if matches!(resp.status().as_u16(), 400 | 404) => {
                    return Ok(WorksheetFetch::NotFound);
                }
                Ok(resp) if resp.status().is_client_error() => {
                    return Err(StoreError(format!(
                        "values fetch failed status={} url={url}",
                        resp.status()
                    )));
                }
                Ok(resp) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(StoreError(format!(
                            "values fetch failed status={} url={url}",
                            resp.status()
                        )));
                    }
                }
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(StoreError(format!("values fetch failed url={url}: {e}")));
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(
                self.retry.base_backoff_ms.saturating_mul(attempt as u64),
            ))
            .await;
        }
    }
}

#[async_trait]
impl SheetStoreBackend for GoogleSheetsBackend {
    fn backend_tag(&self) -> &'static str {
        "google_sheets"
    }

    async fn fetch_worksheet(&self, title: &str) -> Result<WorksheetFetch, StoreError> {
        let bearer = self.bearer_token().await?;
        let url = self.values_url(title);
        self.get_values_with_retry(&url, &bearer).await
    }
}

/// Zips the header row with every data row. Short rows are padded with
/// empty cells; columns under a blank header cell are dropped.
fn rows_from_values(values: &[Vec<Value>]) -> Vec<SheetRow> {
    let Some((header, data)) = values.split_first() else {
        return Vec::new();
    };
    let headers: Vec<String> = header.iter().map(|c| cell_text(c).trim().to_string()).collect();
    data.iter()
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .filter(|(_, h)| !h.is_empty())
                .map(|(i, h)| (h.clone(), row.get(i).map(cell_text).unwrap_or_default()))
                .collect()
        })
        .collect()
}

fn unix_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_zip_pads_short_rows_and_drops_blank_headers() {
        let values = vec![
            vec![json!("Marca"), json!(""), json!("Plataforma")],
            vec![json!("Corona"), json!("ignored"), json!("Instagram")],
            vec![json!("Stella")],
        ];
        let rows = rows_from_values(&values);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Marca").map(String::as_str), Some("Corona"));
        assert_eq!(
            rows[0].get("Plataforma").map(String::as_str),
            Some("Instagram")
        );
        assert_eq!(rows[1].get("Plataforma").map(String::as_str), Some(""));
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn numeric_cells_become_text() {
        let values = vec![vec![json!("Marca"), json!("Nota")], vec![json!("Corona"), json!(7)]];
        let rows = rows_from_values(&values);
        assert_eq!(rows[0].get("Nota").map(String::as_str), Some("7"));
    }

    #[test]
    fn header_only_and_empty_sheets_yield_no_rows() {
        assert!(rows_from_values(&[]).is_empty());
        assert!(rows_from_values(&[vec![json!("Marca")]]).is_empty());
    }

    #[test]
    fn worksheet_titles_are_percent_encoded() {
        assert_eq!(percent_encode("BANCO_INSIGHTS"), "BANCO_INSIGHTS");
        assert_eq!(percent_encode("Mês 1"), "M%C3%AAs%201");
    }

    #[tokio::test]
    async fn local_backend_reads_fixture_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("MARCAS.json"),
            r#"[{"Marca": "Corona"}, {"Marca": "Stella"}]"#,
        )
        .expect("write fixture");
        let backend = LocalJsonBackend::new(dir.path().to_path_buf());
        match backend.fetch_worksheet("MARCAS").await.expect("fetch") {
            WorksheetFetch::Found(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].get("Marca").map(String::as_str), Some("Corona"));
            }
            WorksheetFetch::NotFound => panic!("fixture should be found"),
        }
        assert!(matches!(
            backend.fetch_worksheet("PLATAFORMAS").await.expect("fetch"),
            WorksheetFetch::NotFound
        ));
    }

    #[tokio::test]
    async fn local_backend_rejects_traversal_titles() {
        let backend = LocalJsonBackend::new(PathBuf::from("/tmp"));
        assert!(backend.fetch_worksheet("../etc/passwd").await.is_err());
    }
}
