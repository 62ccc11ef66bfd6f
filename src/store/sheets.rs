//! Google Sheets sink.
//!
//! Authenticates as a service account (OAuth2 JWT-bearer grant) and writes
//! the record into columns A..D of one row through the Sheets v4 REST API.

use super::{Receipt, ResultSink, StoreError, SubjectLineRecord};
use crate::config::{Config, ConfigError};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The parts of a service-account key file this sink needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Credentials(e.to_string()))
    }

    /// Inline JSON wins over the key file path
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        if let Some(json) = config.sheets.credentials_json.as_deref() {
            if !json.trim().is_empty() {
                return Self::from_json(json);
            }
        }

        let path = config
            .sheets
            .credentials
            .as_ref()
            .ok_or(ConfigError::MissingSheetConfig("credentials"))?;
        let json = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Signed RS256 assertion for the JWT-bearer grant
    fn assertion(&self, now: i64) -> Result<String, StoreError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| StoreError::Credentials(format!("private_key: {e}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| StoreError::Credentials(e.to_string()))
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

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct ValueRange<'a> {
    range: &'a str,
    #[serde(rename = "majorDimension")]
    major_dimension: &'a str,
    values: [[&'a str; 4]; 1],
}

/// Writes one record into a fixed row of a spreadsheet.
pub struct SheetSink {
    client: Client,
    api_base: String,
    key: ServiceAccountKey,
    sheet_id: String,
    worksheet: Option<String>,
    row: u32,
}

impl SheetSink {
    pub fn from_config(config: &Config, row: u32) -> Result<Self, StoreError> {
        let sheet_id = config.sheet_id()?.to_string();
        let key = ServiceAccountKey::from_config(config)?;
        let worksheet = config
            .sheets
            .worksheet
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string);
        Self::new(key, sheet_id, worksheet, row)
    }

    pub fn new(
        key: ServiceAccountKey,
        sheet_id: String,
        worksheet: Option<String>,
        row: u32,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: SHEETS_API.to_string(),
            key,
            sheet_id,
            worksheet,
            row,
        })
    }

    /// Send value updates to another Sheets-compatible endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// A1 range covering columns A..D of the target row
    pub fn range(&self) -> Result<String, StoreError> {
        if self.row == 0 {
            return Err(StoreError::InvalidRow(self.row));
        }
        let cells = format!("A{row}:D{row}", row = self.row);
        Ok(match &self.worksheet {
            Some(title) => format!("'{}'!{cells}", title.replace('\'', "''")),
            None => cells,
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}?valueInputOption=USER_ENTERED",
            self.api_base,
            urlencoding::encode(&self.sheet_id),
            urlencoding::encode(range)
        )
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        let assertion = self.key.assertion(Utc::now().timestamp())?;
        let body = format!(
            "grant_type={}&assertion={}",
            urlencoding::encode(JWT_BEARER_GRANT),
            urlencoding::encode(&assertion)
        );

        let response = self
            .client
            .post(&self.key.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Auth(format!("{status}: {text}")));
        }

        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| StoreError::Auth(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl ResultSink for SheetSink {
    async fn write(&self, record: &SubjectLineRecord) -> Result<Receipt, StoreError> {
        let range = self.range()?;
        let token = self.access_token().await?;
        debug!(client_email = %self.key.client_email, "service account authorized");

        let payload = ValueRange {
            range: &range,
            major_dimension: "ROWS",
            values: [record.columns()],
        };

        let response = self
            .client
            .put(self.values_url(&range))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::SheetsStatus {
                status: status.as_u16(),
                body,
            });
        }

        info!(sheet_id = %self.sheet_id, range = %range, "row updated");
        Ok(Receipt::SheetRow(self.row))
    }

    fn describe(&self) -> String {
        format!("Google Sheets row {}", self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    const TEST_PRIVATE_KEY: &str = include_str!("testdata/service_account_key.pem");

    fn key() -> ServiceAccountKey {
        ServiceAccountKey::from_json(
            r#"{
                "type": "service_account",
                "client_email": "writer@project.iam.gserviceaccount.com",
                "private_key": "not a real key"
            }"#,
        )
        .unwrap()
    }

    fn sink(worksheet: Option<&str>, row: u32) -> SheetSink {
        SheetSink::new(
            key(),
            "sheet-123".to_string(),
            worksheet.map(str::to_string),
            row,
        )
        .unwrap()
    }

    #[test]
    fn key_defaults_token_uri() {
        assert_eq!(key().token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn key_without_email_is_rejected() {
        assert!(matches!(
            ServiceAccountKey::from_json(r#"{"private_key": "x"}"#),
            Err(StoreError::Credentials(_))
        ));
    }

    #[test]
    fn range_covers_four_columns_of_row() {
        assert_eq!(sink(None, 7).range().unwrap(), "A7:D7");
        assert_eq!(
            sink(Some("Bob's lines"), 2).range().unwrap(),
            "'Bob''s lines'!A2:D2"
        );
    }

    #[test]
    fn row_zero_is_rejected() {
        assert!(matches!(sink(None, 0).range(), Err(StoreError::InvalidRow(0))));
    }

    #[tokio::test]
    async fn row_zero_fails_before_any_request() {
        let record = SubjectLineRecord {
            subject_line: "s".to_string(),
            score: "1".to_string(),
            template: "t".to_string(),
            category: "Cold".to_string(),
        };
        assert!(matches!(
            sink(None, 0).write(&record).await,
            Err(StoreError::InvalidRow(0))
        ));
    }

    #[test]
    fn values_url_encodes_range() {
        let s = sink(Some("Q1"), 3);
        let range = s.range().unwrap();
        assert_eq!(
            s.values_url(&range),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/%27Q1%27%21A3%3AD3?valueInputOption=USER_ENTERED"
        );
    }

    #[test]
    fn payload_lists_cells_in_column_order() {
        let record = SubjectLineRecord {
            subject_line: "2 Questions YouTubers Need To Stop Asking".to_string(),
            score: "90".to_string(),
            template: "[X] Questions [Audience] Need To Stop Asking".to_string(),
            category: "Informational".to_string(),
        };
        let payload = ValueRange {
            range: "A5:D5",
            major_dimension: "ROWS",
            values: [record.columns()],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "range": "A5:D5",
                "majorDimension": "ROWS",
                "values": [[
                    "2 Questions YouTubers Need To Stop Asking",
                    "90",
                    "[X] Questions [Audience] Need To Stop Asking",
                    "Informational"
                ]]
            })
        );
    }

    #[test]
    fn bad_private_key_is_a_credentials_error() {
        assert!(matches!(
            key().assertion(1_700_000_000),
            Err(StoreError::Credentials(_))
        ));
    }

    fn signing_key(token_uri: String) -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "writer@project.iam.gserviceaccount.com".to_string(),
            private_key: TEST_PRIVATE_KEY.to_string(),
            token_uri,
        }
    }

    fn local_sink(base_url: &str, row: u32) -> SheetSink {
        SheetSink::new(
            signing_key(format!("{base_url}/token")),
            "sheet-123".to_string(),
            None,
            row,
        )
        .unwrap()
        .with_api_base(format!("{base_url}/v4/spreadsheets/"))
    }

    fn record() -> SubjectLineRecord {
        SubjectLineRecord {
            subject_line: "Simple Way to Boost Conversions".to_string(),
            score: "88".to_string(),
            template: "Simple Way to [Goal]".to_string(),
            category: "Promotion".to_string(),
        }
    }

    #[test]
    fn assertion_is_signed_for_token_uri() {
        let token = signing_key(DEFAULT_TOKEN_URI.to_string())
            .assertion(1_700_000_000)
            .unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(token.split('.').count(), 3);
    }

    #[tokio::test]
    async fn write_authorizes_then_updates_row() {
        let (base_url, server) = test_support::serve(vec![
            ("200 OK", r#"{"access_token":"ya29.test","expires_in":3600}"#.to_string()),
            ("200 OK", r#"{"updatedRange":"Sheet1!A5:D5"}"#.to_string()),
        ])
        .await;

        let receipt = local_sink(&base_url, 5).write(&record()).await.unwrap();
        assert_eq!(receipt, Receipt::SheetRow(5));

        let requests = server.await.unwrap();
        assert_eq!(requests[0].request_line, "POST /token HTTP/1.1");
        assert_eq!(
            requests[0].header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert!(requests[0]
            .body
            .starts_with("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer&assertion="));

        assert_eq!(
            requests[1].request_line,
            "PUT /v4/spreadsheets/sheet-123/values/A5%3AD5?valueInputOption=USER_ENTERED HTTP/1.1"
        );
        assert_eq!(requests[1].header("authorization"), Some("Bearer ya29.test"));
        let body: serde_json::Value = serde_json::from_str(&requests[1].body).unwrap();
        assert_eq!(
            body["values"],
            serde_json::json!([[
                "Simple Way to Boost Conversions",
                "88",
                "Simple Way to [Goal]",
                "Promotion"
            ]])
        );
    }

    #[tokio::test]
    async fn rejected_token_request_is_auth_error() {
        let (base_url, server) = test_support::serve(vec![(
            "401 Unauthorized",
            r#"{"error":"invalid_grant"}"#.to_string(),
        )])
        .await;

        let err = local_sink(&base_url, 5).write(&record()).await.unwrap_err();
        assert!(
            matches!(&err, StoreError::Auth(msg) if msg.contains("401") && msg.contains("invalid_grant")),
            "{err}"
        );
        // No value update is attempted
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_update_keeps_status() {
        let (base_url, server) = test_support::serve(vec![
            ("200 OK", r#"{"access_token":"ya29.test"}"#.to_string()),
            ("403 Forbidden", r#"{"error":{"status":"PERMISSION_DENIED"}}"#.to_string()),
        ])
        .await;

        let err = local_sink(&base_url, 5).write(&record()).await.unwrap_err();
        assert!(
            matches!(&err, StoreError::SheetsStatus { status: 403, body } if body.contains("PERMISSION_DENIED")),
            "{err}"
        );
        server.await.unwrap();
    }

    #[test]
    fn missing_credentials_is_config_error() {
        let mut config = Config::default();
        config.sheets.sheet_id = Some("sheet-123".to_string());
        config.sheets.credentials_json = None;
        config.sheets.credentials = None;
        assert!(matches!(
            SheetSink::from_config(&config, 2),
            Err(StoreError::ConfigError(ConfigError::MissingSheetConfig("credentials")))
        ));
    }
}
