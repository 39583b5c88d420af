//! # paw-reports-rest
//!
//! [`ReportClient`] over a hosted PostgREST endpoint (`/rest/v1/public_reports`).
//!
//! Every request carries the project key twice, as `apikey` and as a bearer
//! token. Any non-2xx answer becomes `AppError::Remote` with the status code
//! and the raw body. There is no retry; timeouts come from the HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use paw_core::error::{AppError, Result};
use paw_core::models::{AnimalStatus, Report, ReportCategory};
use paw_core::traits::ReportClient;
use reqwest::{header, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

const REPORTS_PATH: &str = "rest/v1/public_reports";

pub struct PostgrestReportClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

#[derive(Serialize)]
struct StatusPatch {
    status: AnimalStatus,
}

fn http_err(e: reqwest::Error) -> AppError {
    AppError::Internal(format!("report request failed: {e}"))
}

/// Passes 2xx responses through; turns anything else into `AppError::Remote`.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(status = status.as_u16(), error = %e, "could not read error body");
            String::new()
        }
    };
    Err(AppError::Remote {
        status: status.as_u16(),
        body,
    })
}

impl PostgrestReportClient {
    /// `base_url` is the project root, e.g. `https://abcd.supabase.co`.
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), REPORTS_PATH),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        req.header("apikey", key)
            .bearer_auth(key)
            .header(header::ACCEPT, "application/json")
    }
}

#[async_trait]
impl ReportClient for PostgrestReportClient {
    async fn create_report(&self, report: &Report) -> Result<()> {
        report.validate()?;

        // PostgREST takes an array of rows for inserts
        let resp = self
            .authorized(self.http.post(&self.endpoint))
            .json(&[report])
            .send()
            .await
            .map_err(http_err)?;
        check(resp).await?;

        info!(id = %report.id, category = ?report.category, "report created");
        Ok(())
    }

    async fn list_reports(&self, category: Option<ReportCategory>) -> Result<Vec<Report>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(c) = category {
            query.push(("category", format!("eq.{}", c.as_str())));
        }

        let resp = self
            .authorized(self.http.get(&self.endpoint))
            .query(&query)
            .send()
            .await
            .map_err(http_err)?;
        let reports: Vec<Report> = check(resp).await?.json().await.map_err(http_err)?;

        debug!(count = reports.len(), ?category, "reports fetched");
        Ok(reports)
    }

    async fn update_status(&self, id: Uuid, status: AnimalStatus) -> Result<()> {
        let resp = self
            .authorized(self.http.patch(&self.endpoint))
            .query(&[("id", format!("eq.{id}"))])
            .json(&StatusPatch { status })
            .send()
            .await
            .map_err(http_err)?;
        check(resp).await?;

        info!(%id, %status, "report status updated");
        Ok(())
    }

    async fn ping(&self) -> Result<u16> {
        let resp = self
            .authorized(self.http.get(&self.endpoint))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .map_err(http_err)?;
        Ok(resp.status().as_u16())
    }
}
