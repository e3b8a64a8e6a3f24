//! Black-box HTTP client for the application's API surface

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};

/// Status and decoded body of one API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// JSON body, or the raw text as a string when it is not JSON
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn expect_status(&self, status: u16) -> E2eResult<&Self> {
        if self.status != status {
            return Err(E2eError::AssertionFailed(format!(
                "expected HTTP {}, got {} ({})",
                status, self.status, self.body
            )));
        }
        Ok(self)
    }

    pub fn expect_success(&self) -> E2eResult<&Self> {
        if !self.is_success() {
            return Err(E2eError::AssertionFailed(format!(
                "expected a 2xx response, got {} ({})",
                self.status, self.body
            )));
        }
        Ok(self)
    }

    /// Deserialize the body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> E2eResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Thin wrapper over `reqwest` rooted at the suite's base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &SuiteConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeouts.navigation())
            .danger_accept_invalid_certs(config.ignore_https_errors)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> E2eResult<ApiResponse> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        debug!("API response {}", status);
        Ok(ApiResponse { status, body })
    }

    pub async fn request(&self, method: Method, path: &str) -> E2eResult<ApiResponse> {
        debug!("API {} {}", method, path);
        self.send(self.client.request(method, self.url(path))).await
    }

    pub async fn request_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> E2eResult<ApiResponse> {
        debug!("API {} {}", method, path);
        self.send(self.client.request(method, self.url(path)).json(body))
            .await
    }

    pub async fn get(&self, path: &str) -> E2eResult<ApiResponse> {
        self.request(Method::GET, path).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> E2eResult<ApiResponse> {
        self.request_json(Method::POST, path, body).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> E2eResult<ApiResponse> {
        self.request_json(Method::PUT, path, body).await
    }

    pub async fn delete(&self, path: &str) -> E2eResult<ApiResponse> {
        self.request(Method::DELETE, path).await
    }

    /// Multipart upload of one file under the form field `field`
    pub async fn upload(&self, path: &str, field: &str, file: &Path) -> E2eResult<ApiResponse> {
        let data = tokio::fs::read(file).await?;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!("API upload {} ({} bytes) to {}", name, data.len(), path);

        let form = Form::new().part(field.to_string(), Part::bytes(data).file_name(name));
        self.send(self.client.post(self.url(path)).multipart(form))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn respond_with(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> ApiClient {
        let config = SuiteConfig {
            base_url,
            ..SuiteConfig::default()
        };
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_join() {
        let client = client_for("https://example.test/".to_string());
        assert_eq!(client.url("/api/homework"), "https://example.test/api/homework");
        assert_eq!(client.url("api/homework/7"), "https://example.test/api/homework/7");
    }

    #[tokio::test]
    async fn test_json_body_decoded() {
        let base = respond_with("201 Created", r#"{"id":"7","title":"T"}"#).await;
        let client = client_for(base);
        let response = client
            .post("/api/homework", &json!({ "title": "T" }))
            .await
            .unwrap();
        assert_eq!(response.status, 201);
        assert!(response.is_success());
        assert_eq!(response.body["id"], "7");
        assert!(response.expect_status(200).is_err());
    }

    #[tokio::test]
    async fn test_non_json_body_kept_as_text() {
        let base = respond_with("401 Unauthorized", "Unauthorized").await;
        let response = client_for(base).get("/api/homework").await.unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(response.body, Value::String("Unauthorized".to_string()));
        assert!(matches!(
            response.expect_success(),
            Err(E2eError::AssertionFailed(_))
        ));
    }
}
