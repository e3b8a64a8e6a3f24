//! Typed access to `/api/homework` and `/api/upload`

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use okiedokie_harness::{ApiClient, ApiResponse, E2eError, E2eResult};

pub const HOMEWORK_PATH: &str = "/api/homework";
pub const UPLOAD_PATH: &str = "/api/upload";

/// A homework item as the API lists it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Homework {
    /// Numeric or string, depending on the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Homework {
    pub fn new(subject: &str, title: &str, message: &str) -> Self {
        Self {
            id: None,
            subject: Some(subject.to_string()),
            title: Some(title.to_string()),
            message: Some(message.to_string()),
        }
    }

    /// Path segment for the item's id
    pub fn id_segment(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

pub struct HomeworkApi<'a> {
    client: &'a ApiClient,
}

impl<'a> HomeworkApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list_raw(&self) -> E2eResult<ApiResponse> {
        self.client.get(HOMEWORK_PATH).await
    }

    /// All items; a non-2xx status is an assertion failure
    pub async fn list(&self) -> E2eResult<Vec<Homework>> {
        let response = self.list_raw().await?;
        response.expect_success()?;
        match &response.body {
            Value::Array(_) => response.json(),
            other => Err(E2eError::AssertionFailed(format!(
                "expected a homework list, got {}",
                other
            ))),
        }
    }

    pub async fn create(&self, homework: &Homework) -> E2eResult<ApiResponse> {
        self.client.post(HOMEWORK_PATH, homework).await
    }

    pub async fn update(&self, id: &str, changes: &Value) -> E2eResult<ApiResponse> {
        self.client.put(&format!("{}/{}", HOMEWORK_PATH, id), changes).await
    }

    pub async fn delete(&self, id: &str) -> E2eResult<ApiResponse> {
        self.client.delete(&format!("{}/{}", HOMEWORK_PATH, id)).await
    }

    pub async fn upload(&self, file: &Path) -> E2eResult<ApiResponse> {
        self.client.upload(UPLOAD_PATH, "file", file).await
    }
}
