// 🌐 Google Sheets v4 REST client
//
// API-key authenticated. Values are written RAW and appended with
// INSERT_ROWS so existing rows never shift.

use super::TabularService;
use crate::config::FundConfig;
use crate::error::{FundError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct SheetsClient {
    http_client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsClient {
    pub fn new(config: &FundConfig) -> Self {
        SheetsClient {
            http_client: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            api_key: config.credential().map(str::to_string),
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| FundError::Unavailable("API key not configured".to_string()))
    }

    async fn check(operation: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(FundError::remote(operation, format!("{}: {}", status, body)))
        }
    }
}

/// Formatted values come back as strings, but numbers/bools may not
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl TabularService for SheetsClient {
    async fn open_session(&self) -> Result<()> {
        let key = self.key()?;
        let response = self
            .http_client
            .get(self.spreadsheet_url())
            .query(&[("key", key), ("fields", "spreadsheetId")])
            .send()
            .await
            .map_err(|e| FundError::Unavailable(e.to_string()))?;

        Self::check("open session", response)
            .await
            .map(|_| ())
            .map_err(|e| FundError::Unavailable(e.to_string()))
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let response = self
            .http_client
            .get(self.values_url(range))
            .query(&[("key", self.key()?)])
            .send()
            .await?;

        let body: ValueRangeResponse = Self::check("get values", response)
            .await?
            .json()
            .await
            .map_err(|e| FundError::remote("get values", e))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn update_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let body = ValueRange {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let response = self
            .http_client
            .put(self.values_url(range))
            .query(&[("key", self.key()?), ("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await?;

        Self::check("update values", response).await.map(|_| ())
    }

    async fn append_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let body = ValueRange {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let response = self
            .http_client
            .post(format!("{}:append", self.values_url(range)))
            .query(&[
                ("key", self.key()?),
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&body)
            .send()
            .await?;

        Self::check("append values", response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SheetsClient {
        SheetsClient::new(&FundConfig {
            spreadsheet_id: "abc".to_string(),
            api_key: Some("k".to_string()),
            api_base_url: "https://example.test/v4/spreadsheets/".to_string(),
            ..FundConfig::default()
        })
    }

    #[test]
    fn test_values_url_encodes_range() {
        assert_eq!(
            client().values_url("Sheet1!A5:H5"),
            "https://example.test/v4/spreadsheets/abc/values/Sheet1%21A5%3AH5"
        );
    }

    #[test]
    fn test_placeholder_key_is_not_sent() {
        let client = SheetsClient::new(&FundConfig::default());
        assert!(matches!(client.key(), Err(FundError::Unavailable(_))));
    }

    #[test]
    fn test_response_cells_become_strings() {
        let body: ValueRangeResponse =
            serde_json::from_str(r#"{"range":"Sheet1!A1:C2","values":[["ID","Amount"],[17,1000.5,null]]}"#).unwrap();
        let rows: Vec<Vec<String>> = body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();

        assert_eq!(rows[0], vec!["ID", "Amount"]);
        assert_eq!(rows[1], vec!["17", "1000.5", ""]);
    }

    #[test]
    fn test_empty_range_has_no_values_field() {
        let body: ValueRangeResponse = serde_json::from_str(r#"{"range":"Mentors!A1:E1"}"#).unwrap();
        assert!(body.values.is_empty());
    }
}
