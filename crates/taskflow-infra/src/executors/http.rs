//! HTTP task type.
//!
//! Parameters:
//! - `url` (required)
//! - `method` -- defaults to GET
//! - `headers` -- object of header name to value
//! - `body` -- string sent as-is, anything else sent as JSON

use serde_json::{Value, json};
use taskflow_core::task::{TaskExecutor, TaskOutput};
use taskflow_types::error::TaskError;
use taskflow_types::task::TaskConfig;

/// Performs one HTTP request per attempt. Status >= 400 is a failure.
#[derive(Debug, Clone, Default)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build_request(&self, task: &TaskConfig) -> Result<reqwest::RequestBuilder, TaskError> {
        let url = task.param_str("url").ok_or_else(|| {
            TaskError::InvalidParameters(format!("task '{}' has no 'url'", task.task_id))
        })?;
        let method_str = task.param_str("method").unwrap_or("GET").to_ascii_uppercase();
        let method: reqwest::Method = method_str.parse().map_err(|_| {
            TaskError::InvalidParameters(format!("invalid HTTP method: {method_str}"))
        })?;

        let mut request = self.client.request(method, url);

        if let Some(headers) = task.parameters.get("headers") {
            let headers = headers.as_object().ok_or_else(|| {
                TaskError::InvalidParameters("'headers' must be an object".to_string())
            })?;
            for (key, value) in headers {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                request = request.header(key.as_str(), value);
            }
        }

        match task.parameters.get("body") {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => request = request.body(s.clone()),
            Some(other) => request = request.json(other),
        }

        Ok(request)
    }
}

impl TaskExecutor for HttpExecutor {
    async fn execute(&self, task: &TaskConfig) -> Result<TaskOutput, TaskError> {
        let request = self.build_request(task)?;
        let url = task.param_str("url").unwrap_or_default();

        let response = request
            .send()
            .await
            .map_err(|e| TaskError::failed(format!("HTTP request to '{url}' failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TaskError::failed(format!("failed to read HTTP response body: {e}")))?;

        tracing::info!(
            task_id = task.task_id.as_str(),
            url,
            status = status.as_u16(),
            body_len = text.len(),
            "HTTP task completed"
        );

        if status.is_client_error() || status.is_server_error() {
            return Err(TaskError::failed(format!("'{url}' returned {status}")));
        }

        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        Ok(json!({
            "status": status.as_u16(),
            "body": body,
        }))
    }
}
