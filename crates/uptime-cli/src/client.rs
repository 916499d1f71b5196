//! API client for communicating with the uptime service

use anyhow::{Context, Result};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uptime_lib::StoreReport;
use url::Url;

/// API client for the uptime service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Response to a report trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub report_id: String,
}

/// Remote report state as seen through `/get_report`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteReport {
    Running,
    Complete { csv: String },
    Failed { error: String },
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    error: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request without a body
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Start a report, optionally with a window policy
    pub async fn trigger_report(&self, policy: Option<&str>) -> Result<TriggerResponse> {
        let path = match policy {
            Some(policy) => format!("trigger_report?policy={}", policy),
            None => "trigger_report".to_string(),
        };
        self.post(&path).await
    }

    /// One store's report with per-horizon detail
    pub async fn store_report(&self, store_id: u64, policy: Option<&str>) -> Result<StoreReport> {
        let path = match policy {
            Some(policy) => format!("stores/{}/report?policy={}", store_id, policy),
            None => format!("stores/{}/report", store_id),
        };
        self.get(&path).await
    }

    /// Poll a report by id
    pub async fn fetch_report(&self, report_id: &str) -> Result<RemoteReport> {
        let url = self
            .base_url
            .join(&format!("get_report/{}", report_id))
            .context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let is_csv = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/csv"))
            .unwrap_or(false);
        let body = response.text().await.context("Failed to read response")?;

        match status {
            StatusCode::OK if is_csv => Ok(RemoteReport::Complete { csv: body }),
            StatusCode::OK => Ok(RemoteReport::Running),
            StatusCode::INTERNAL_SERVER_ERROR => {
                let parsed: StatusBody = serde_json::from_str(&body).unwrap_or(StatusBody {
                    error: Some(body.clone()),
                });
                Ok(RemoteReport::Failed {
                    error: parsed.error.unwrap_or_else(|| "unknown error".to_string()),
                })
            }
            StatusCode::NOT_FOUND => anyhow::bail!("Report {} not found", report_id),
            other => anyhow::bail!("API error ({}): {}", other, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_report_states() {
        let mut server = mockito::Server::new_async().await;
        let running = server
            .mock("GET", "/get_report/a")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"Running"}"#)
            .create_async()
            .await;
        let complete = server
            .mock("GET", "/get_report/b")
            .with_status(200)
            .with_header("content-type", "text/csv; charset=utf-8")
            .with_body("store_id,uptime_last_hour\n1,60.00\n")
            .create_async()
            .await;
        let failed = server
            .mock("GET", "/get_report/c")
            .with_status(500)
            .with_body(r#"{"status":"Failed","error":"export directory missing"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert_eq!(client.fetch_report("a").await.unwrap(), RemoteReport::Running);
        assert!(matches!(
            client.fetch_report("b").await.unwrap(),
            RemoteReport::Complete { csv } if csv.starts_with("store_id")
        ));
        assert_eq!(
            client.fetch_report("c").await.unwrap(),
            RemoteReport::Failed {
                error: "export directory missing".to_string()
            }
        );

        running.assert_async().await;
        complete.assert_async().await;
        failed.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_report_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/get_report/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(client.fetch_report("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_trigger_report() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                mockito::Matcher::Regex(r"^/trigger_report".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"report_id":"1b4e28ba-2fa1-11d2-883f-0016d3cca427"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.trigger_report(Some("hours")).await.unwrap();
        assert_eq!(response.report_id, "1b4e28ba-2fa1-11d2-883f-0016d3cca427");
    }
}
