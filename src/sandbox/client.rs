//! Remote code-sandbox service client
//!
//! The sandbox runs model-written code in an isolated kernel and stores user
//! files. Tools hold the service behind the [`CodeSandbox`] trait so tests can
//! substitute a mock.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::common::prelude::*;
use crate::config::SandboxSettings;
use crate::sandbox::types::Execution;

/// Remote directory user files are stored under
pub const REMOTE_HOME: &str = "/home/user/";

/// Remote execution service for model-written code
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    /// Run a code cell and return its captured outputs
    async fn run_code(&self, code: &str) -> Result<Execution>;

    /// Store raw bytes under the given name; returns the remote path
    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<String>;

    /// Fetch the raw bytes of a remote file
    async fn download_file(&self, remote_path: &str) -> Result<Vec<u8>>;
}

/// HTTP client for a hosted sandbox service
pub struct HttpSandbox {
    api_base: String,
    api_key: Option<String>,
    http_client: Client,
}

impl HttpSandbox {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            http_client,
        }
    }

    /// Build a client from settings, reading the key from the configured
    /// environment variable
    pub fn from_settings(settings: &SandboxSettings) -> Self {
        let api_key = std::env::var(&settings.api_key_env).ok();
        if api_key.is_none() {
            debug!(
                env_var = %settings.api_key_env,
                "Sandbox API key not set, proceeding unauthenticated"
            );
        }
        Self::new(&settings.api_base, api_key)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl CodeSandbox for HttpSandbox {
    async fn run_code(&self, code: &str) -> Result<Execution> {
        let url = format!("{}/executions", self.api_base);
        debug!(bytes = code.len(), "Submitting code to sandbox");

        let request = self.http_client.post(&url).json(&ExecuteRequest { code });
        let response = self.authorized(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::sandbox(format!(
                "Execution request failed with {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<String> {
        let url = format!("{}/files/{}", self.api_base, name);
        debug!(name, bytes = bytes.len(), "Uploading file to sandbox");

        let request = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        let response = self.authorized(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::sandbox(format!(
                "Upload of '{name}' failed with {status}: {body}"
            )));
        }

        let uploaded: UploadResponse = response.json().await?;
        Ok(uploaded.path)
    }

    async fn download_file(&self, remote_path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files", self.api_base);
        debug!(remote_path, "Downloading file from sandbox");

        let request = self.http_client.get(&url).query(&[("path", remote_path)]);
        let response = self.authorized(request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::sandbox(format!("Remote file not found: {remote_path}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::sandbox(format!(
                "Download of '{remote_path}' failed with {status}: {body}"
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    path: String,
}
