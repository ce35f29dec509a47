// ==============================================================================
// molgenis.rs - MOLGENIS REST Client
// ==============================================================================
// Description: TableStore implementation backed by the MOLGENIS REST API
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Endpoints:
//   POST   {url}/api/v1/login                      {"username", "password"}
//   GET    {url}/api/v2/{table}?num={n}&start={k}  -> {"total", "items"}
//   POST   {url}/api/v2/{table}                    {"entities": [...]}
//   DELETE {url}/api/v2/{table}                    {"entityIds": [...]}
// ==============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::store::{Row, StoreError, TableStore};

const TOKEN_HEADER: &str = "x-molgenis-token";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Response body of a v2 collection read
#[derive(Debug, Deserialize)]
struct EntityCollection {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    items: Vec<Row>,
}

/// Authenticated MOLGENIS session
pub struct MolgenisClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MolgenisClient {
    /// Log in and keep the session token for subsequent requests
    pub async fn login(url: &str, account: &str, password: &str) -> Result<Self, StoreError> {
        let http = reqwest::Client::new();
        let base_url = normalize_base_url(url);
        let login_url = format!("{}/api/v1/login", base_url);

        let response = http
            .post(&login_url)
            .json(&json!({ "username": account, "password": password }))
            .send()
            .await
            .map_err(|e| StoreError::Login(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Login(format!("{} returned HTTP {}", login_url, status.as_u16())));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Login(format!("unexpected login response: {}", e)))?;

        info!("Logged in to {} as {}", base_url, account);

        Ok(Self {
            http,
            base_url,
            token: body.token,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/api/v2/{}", self.base_url, table)
    }

    async fn get_collection(&self, table: &str, num: usize, start: usize) -> Result<EntityCollection, StoreError> {
        let response = self
            .http
            .get(self.table_url(table))
            .query(&[("num", num), ("start", start)])
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| http_error(table, e))?;

        let response = check_status(response, "read", table).await?;
        response.json().await.map_err(|e| http_error(table, e))
    }
}

#[async_trait]
impl TableStore for MolgenisClient {
    async fn count(&self, table: &str) -> Result<usize, StoreError> {
        let collection = self.get_collection(table, 1, 0).await?;
        debug!("{} holds {} rows", table, collection.total);
        Ok(collection.total)
    }

    async fn read_page(&self, table: &str, page_size: usize, offset: usize) -> Result<Vec<Row>, StoreError> {
        debug!("Reading {} rows of {} from offset {}", page_size, table, offset);
        Ok(self.get_collection(table, page_size, offset).await?.items)
    }

    async fn delete_batch(&self, table: &str, ids: &[String]) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.table_url(table))
            .header(TOKEN_HEADER, &self.token)
            .json(&delete_body(ids))
            .send()
            .await
            .map_err(|e| http_error(table, e))?;

        check_status(response, "delete", table).await?;
        Ok(())
    }

    async fn insert_batch(&self, table: &str, rows: &[Row]) -> Result<(), StoreError> {
        let response = self
            .http
            .post(self.table_url(table))
            .header(TOKEN_HEADER, &self.token)
            .json(&insert_body(rows))
            .send()
            .await
            .map_err(|e| http_error(table, e))?;

        check_status(response, "insert", table).await?;
        Ok(())
    }
}

fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    // Config files often carry the legacy "/api/" suffix
    trimmed.strip_suffix("/api").unwrap_or(trimmed).to_string()
}

fn delete_body(ids: &[String]) -> serde_json::Value {
    json!({ "entityIds": ids })
}

fn insert_body(rows: &[Row]) -> serde_json::Value {
    json!({ "entities": rows })
}

fn http_error(table: &str, source: reqwest::Error) -> StoreError {
    StoreError::Http {
        table: table.to_string(),
        source,
    }
}

async fn check_status(
    response: reqwest::Response,
    operation: &'static str,
    table: &str,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        operation,
        table: table.to_string(),
        status: status.as_u16(),
        body,
    })
}
