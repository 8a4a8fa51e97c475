//! OpenAI-compatible chat completions client
//!
//! Talks to any endpoint that speaks the `/chat/completions` protocol with
//! function tools. The transcript types in [`crate::llm::types`] stay wire
//! agnostic; this module owns the request/response DTOs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::prelude::*;
use crate::config::ModelSettings;
use crate::llm::types::{ChatMessage, ContentPart, MessageContent, ModelTurn, ToolCall, ToolSpec};

/// A chat model that can answer or request tool invocations
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion over the transcript with the given tools available
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelTurn>;

    /// Model identifier used in requests
    fn model_name(&self) -> &str;
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct OpenAiChatModel {
    api_base: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    http_client: Client,
}

impl OpenAiChatModel {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            temperature,
            http_client,
        }
    }

    /// Build a client from settings, reading the key from the configured
    /// environment variable
    pub fn from_settings(settings: &ModelSettings) -> Self {
        let api_key = std::env::var(&settings.api_key_env).ok();
        if api_key.is_none() {
            warn!(
                env_var = %settings.api_key_env,
                "Model API key not set, requests will likely be rejected"
            );
        }
        Self::new(
            &settings.api_base,
            api_key,
            &settings.name,
            settings.temperature,
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: messages.iter().map(ApiMessage::from_message).collect(),
            tools: tools.iter().map(ApiTool::from_spec).collect(),
            tool_choice: if tools.is_empty() { None } else { Some("auto") },
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelTurn> {
        let request = self.build_request(messages, tools);
        let url = format!("{}/chat/completions", self.api_base);

        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending chat completion request"
        );

        let mut builder = self.http_client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(parsed) => parsed.error.message,
                Err(_) => body,
            };
            return Err(Error::llm(format!("API error {status}: {message}")));
        }

        let api_response: ApiResponse = response.json().await?;
        if let Some(usage) = &api_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::llm("Chat completion returned no choices"))?;

        Ok(choice.message.into_turn())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn from_message(message: &ChatMessage) -> Self {
        let content = match &message.content {
            MessageContent::Text(text) => Some(Value::String(text.clone())),
            MessageContent::Parts(parts) => Some(Value::Array(
                parts.iter().map(content_part_value).collect(),
            )),
        };
        Self {
            role: message.role.as_str().to_string(),
            content,
            tool_calls: message.tool_calls.iter().map(ApiToolCall::from_call).collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    fn into_turn(self) -> ModelTurn {
        let text = match self.content {
            Some(Value::String(text)) if !text.is_empty() => Some(text),
            _ => None,
        };

        if self.tool_calls.is_empty() {
            return ModelTurn::Answer(text.unwrap_or_default());
        }

        let calls = self
            .tool_calls
            .into_iter()
            .map(|call| call.into_call())
            .collect();
        ModelTurn::ToolCalls { text, calls }
    }
}

fn content_part_value(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text(text) => serde_json::json!({ "type": "text", "text": text }),
        ContentPart::Image { url } => serde_json::json!({
            "type": "image_url",
            "image_url": { "url": url },
        }),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ApiFunctionCall,
}

impl ApiToolCall {
    fn from_call(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            call_type: "function".to_string(),
            function: ApiFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            },
        }
    }

    fn into_call(self) -> ToolCall {
        // Arguments arrive as a JSON-encoded string. Keep the raw text if it
        // does not parse so the tool can report the problem.
        let arguments = serde_json::from_str(&self.function.arguments)
            .unwrap_or(Value::String(self.function.arguments));
        ToolCall {
            id: self.id,
            name: self.function.name,
            arguments,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunctionDecl,
}

impl ApiTool {
    fn from_spec(spec: &ToolSpec) -> Self {
        Self {
            tool_type: "function",
            function: ApiFunctionDecl {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiFunctionDecl {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    #[allow(dead_code)]
    error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    fn model() -> OpenAiChatModel {
        OpenAiChatModel::new("https://api.openai.com/v1/", None, "gpt-4o", 0.0)
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let m = model();
        assert_eq!(m.api_base(), "https://api.openai.com/v1");
        assert_eq!(m.model_name(), "gpt-4o");
        assert!(!m.has_api_key());
    }

    #[test]
    #[serial]
    fn test_from_settings_reads_key_from_env() {
        let mut settings = ModelSettings::default();
        settings.api_key_env = "EASEL_TEST_MODEL_KEY".to_string();

        std::env::set_var("EASEL_TEST_MODEL_KEY", "sk-test");
        let m = OpenAiChatModel::from_settings(&settings);
        std::env::remove_var("EASEL_TEST_MODEL_KEY");

        assert!(m.has_api_key());
        assert_eq!(m.model_name(), "gpt-4o-mini");
    }

    #[test]
    #[serial]
    fn test_from_settings_tolerates_missing_key() {
        let mut settings = ModelSettings::default();
        settings.api_key_env = "EASEL_TEST_ABSENT_KEY".to_string();

        std::env::remove_var("EASEL_TEST_ABSENT_KEY");
        let m = OpenAiChatModel::from_settings(&settings);

        assert!(!m.has_api_key());
    }

    #[test]
    fn test_request_serialization_with_tools() {
        let m = model();
        let messages = vec![
            ChatMessage::system("You are helpful."),
            ChatMessage::user("Plot something"),
        ];
        let tools = vec![ToolSpec {
            name: "execute_python".into(),
            description: "Run Python code".into(),
            parameters: json!({
                "type": "object",
                "properties": { "code": { "type": "string" } },
                "required": ["code"],
            }),
        }];

        let request = m.build_request(&messages, &tools);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["tool_choice"], "auto");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Plot something");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "execute_python");
        // No tool calls on plain messages
        assert!(value["messages"][0].get("tool_calls").is_none());
    }

    #[test]
    fn test_request_serialization_without_tools() {
        let m = model();
        let request = m.build_request(&[ChatMessage::user("hi")], &[]);
        let value = serde_json::to_value(&request).unwrap();

        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn test_multimodal_message_serialization() {
        let m = model();
        let messages = vec![ChatMessage::user_with_image(
            "Describe this",
            "data:image/png;base64,AAAA",
        )];
        let request = m.build_request(&messages, &[]);
        let value = serde_json::to_value(&request).unwrap();

        let content = &value["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "Describe this");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_tool_result_serialization() {
        let m = model();
        let messages = vec![ChatMessage::tool_result("call_0", "stdout: 42")];
        let request = m.build_request(&messages, &[]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["messages"][0]["role"], "tool");
        assert_eq!(value["messages"][0]["tool_call_id"], "call_0");
        assert_eq!(value["messages"][0]["content"], "stdout: 42");
    }

    #[test]
    fn test_response_with_tool_calls_parses_arguments() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_0",
                        "type": "function",
                        "function": {
                            "name": "execute_python",
                            "arguments": "{\"code\": \"print(1)\"}"
                        }
                    }]
                }
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        });

        let response: ApiResponse = serde_json::from_value(body).unwrap();
        let turn = response.choices.into_iter().next().unwrap().message.into_turn();

        match turn {
            ModelTurn::ToolCalls { text, calls } => {
                assert!(text.is_none());
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "execute_python");
                assert_eq!(calls[0].string_arg("code"), Some("print(1)"));
            }
            ModelTurn::Answer(_) => panic!("expected tool calls"),
        }
    }

    #[test]
    fn test_response_answer() {
        let body = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "All done." }
            }]
        });

        let response: ApiResponse = serde_json::from_value(body).unwrap();
        let turn = response.choices.into_iter().next().unwrap().message.into_turn();
        assert_eq!(turn, ModelTurn::Answer("All done.".into()));
    }

    #[test]
    fn test_malformed_arguments_kept_as_string() {
        let call = ApiToolCall {
            id: "call_0".into(),
            call_type: "function".into(),
            function: ApiFunctionCall {
                name: "execute_python".into(),
                arguments: "not json".into(),
            },
        };
        let parsed = call.into_call();
        assert_eq!(parsed.arguments, Value::String("not json".into()));
    }

    #[tokio::test]
    async fn test_complete_connection_error() {
        // Nothing listens on this port
        let m = OpenAiChatModel::new("http://localhost:65535", None, "gpt-4o", 0.0);
        let result = m.complete(&[ChatMessage::user("hi")], &[]).await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
