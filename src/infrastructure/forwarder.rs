//! HTTP transport for request forwarding
//!
//! Resolves a payload's subpath against the module's internal base address
//! and relays the response verbatim. Deadlines are enforced per call; an
//! exceeded deadline is a failure, never indefinite blocking.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::application::router::{ForwardError, ForwardedResponse, ModuleClient, RequestPayload};
use crate::domain::module::Module;

/// Reqwest-backed module client
pub struct HttpModuleClient {
    client: reqwest::Client,
}

impl HttpModuleClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Join a module base address and a subpath without doubling slashes
pub fn module_url(base_address: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_address.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[async_trait]
impl ModuleClient for HttpModuleClient {
    async fn forward(
        &self,
        module: &Module,
        payload: &RequestPayload,
        deadline: Duration,
    ) -> Result<ForwardedResponse, ForwardError> {
        let url = module_url(&module.base_address, &payload.path);

        let mut request = self
            .client
            .request(payload.method.clone(), &url)
            .timeout(deadline);
        if let Some(content_type) = &payload.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if !payload.body.is_empty() {
            request = request.body(payload.body.clone());
        }

        let response = request.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response.bytes().await.map_err(classify_error)?;

        Ok(ForwardedResponse {
            status,
            body,
            content_type,
        })
    }
}

fn classify_error(error: reqwest::Error) -> ForwardError {
    if error.is_timeout() {
        ForwardError::DeadlineExceeded
    } else {
        ForwardError::Transport {
            message: error.to_string(),
        }
    }
}
