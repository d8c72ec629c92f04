//! HTTP-backed collaborators for OpenAI-compatible chat endpoints.
//!
//! These implement the core collaborator traits by transporting prompts and
//! raw text only; scoring, remapping, and annotation validation all happen
//! on the core side. Request timeouts live here, not in the orchestration
//! layer.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use tandem_core::parser;
use tandem_core::{
    CodeGenerator, CodeReviewer, CollaboratorError, CollaboratorResult, ReviewFinding,
};

use crate::config::{EndpointConfig, ReviewerConfig, WriterConfig};
use crate::prompts;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Minimal chat-completions client for one endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(endpoint: &EndpointConfig, timeout: Duration) -> CollaboratorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: endpoint.url.trim_end_matches('/').to_string(),
            model: endpoint.model.clone(),
            api_key: endpoint.api_key.clone(),
        })
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> CollaboratorResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(CollaboratorError::EmptyResponse);
        }

        debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}

/// Writer collaborator over HTTP.
pub struct HttpWriter {
    client: ChatClient,
    config: WriterConfig,
}

impl HttpWriter {
    pub fn new(config: WriterConfig, timeout: Duration) -> CollaboratorResult<Self> {
        let client = ChatClient::new(&config.endpoint, timeout)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CodeGenerator for HttpWriter {
    async fn generate(&self, prompt: &str, context: &str) -> CollaboratorResult<String> {
        let user = if context.trim().is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt}\n\nContext:\n{context}")
        };
        self.client
            .complete(
                prompts::WRITER_PREAMBLE,
                &user,
                self.config.temperature,
                self.config.max_tokens,
            )
            .await
    }

    async fn refine(&self, code: &str, feedback: &str) -> CollaboratorResult<String> {
        let user = format!(
            "Here is your previous code:\n{code}\n\n{feedback}\n\nReturn the full revised code."
        );
        // Refinement runs cooler than initial generation.
        self.client
            .complete(
                prompts::WRITER_PREAMBLE,
                &user,
                self.config.refine_temperature,
                self.config.max_tokens,
            )
            .await
    }

    async fn suggest(&self, code: &str) -> CollaboratorResult<String> {
        self.client
            .complete(
                prompts::SUGGEST_PREAMBLE,
                code,
                self.config.refine_temperature,
                self.config.max_tokens,
            )
            .await
    }
}

/// Reviewer collaborator over HTTP.
pub struct HttpReviewer {
    client: ChatClient,
    config: ReviewerConfig,
}

impl HttpReviewer {
    pub fn new(config: ReviewerConfig, timeout: Duration) -> CollaboratorResult<Self> {
        let client = ChatClient::new(&config.endpoint, timeout)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CodeReviewer for HttpReviewer {
    async fn review(&self, code: &str) -> CollaboratorResult<Vec<ReviewFinding>> {
        let user = review_request(&self.config, code);
        let raw = self
            .client
            .complete(
                prompts::REVIEWER_PREAMBLE,
                &user,
                self.config.temperature,
                self.config.max_tokens,
            )
            .await?;
        Ok(parser::parse_findings(&raw))
    }

    async fn scan(&self, code: &str) -> CollaboratorResult<String> {
        self.client
            .complete(
                prompts::SCAN_PREAMBLE,
                code,
                self.config.temperature,
                self.config.max_tokens,
            )
            .await
    }
}

/// Build the review request, folding the configured passes into the prompt.
fn review_request(config: &ReviewerConfig, code: &str) -> String {
    let mut passes = vec!["correctness"];
    if config.include_security {
        passes.push("security");
    }
    if config.include_performance {
        passes.push("performance");
    }
    if config.include_style {
        passes.push("style");
    }
    format!(
        "Review the following code. Focus areas: {}.\n\n{code}",
        passes.join(", ")
    )
}
