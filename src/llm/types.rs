//! Chat transcript types for the tool-calling model endpoint

use serde_json::Value;

/// Role of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// Message content: plain text or multimodal parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// The textual portion of the content (first text part for multimodal)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            }),
        }
    }
}

/// One part of a multimodal user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// An image reference; `url` is usually a base64 data URL
    Image { url: String },
}

/// One tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Endpoint-assigned call id, echoed back with the result
    pub id: String,
    pub name: String,
    /// Parsed arguments object
    pub arguments: Value,
}

impl ToolCall {
    /// Fetch a string argument by name
    pub fn string_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }
}

/// Declaration of a callable tool sent with each request
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// A message in the conversation transcript
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
    /// Tool invocations attached to an assistant message
    pub tool_calls: Vec<ToolCall>,
    /// Id of the call this message answers (tool role only)
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// A user message carrying an inline image alongside its text
    pub fn user_with_image(content: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text(content.into()),
                ContentPart::Image {
                    url: image_url.into(),
                },
            ]),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// An assistant message requesting tool invocations
    pub fn assistant_tool_calls(text: Option<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.unwrap_or_default()),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// A tool-role message answering one tool call
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::Text(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Append text to the message content (system prompt amendments)
    pub fn append_text(&mut self, extra: &str) {
        match &mut self.content {
            MessageContent::Text(text) => text.push_str(extra),
            MessageContent::Parts(parts) => parts.push(ContentPart::Text(extra.to_string())),
        }
    }
}

/// What the model returned for one request: a final answer or tool calls
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    Answer(String),
    ToolCalls {
        /// Leading text emitted alongside the calls, if any
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        let system = ChatMessage::system("You are helpful.");
        assert_eq!(system.role, Role::System);
        assert_eq!(system.content.as_text(), Some("You are helpful."));

        let user = ChatMessage::user("Hello");
        assert_eq!(user.role, Role::User);
        assert!(user.tool_calls.is_empty());

        let assistant = ChatMessage::assistant("Hi there!");
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn test_user_with_image_builds_parts() {
        let msg = ChatMessage::user_with_image("What is this?", "data:image/png;base64,AAAA");
        match &msg.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0], ContentPart::Text("What is this?".into()));
                assert!(matches!(parts[1], ContentPart::Image { .. }));
            }
            MessageContent::Text(_) => panic!("expected multimodal parts"),
        }
        assert_eq!(msg.content.as_text(), Some("What is this?"));
    }

    #[test]
    fn test_tool_result_carries_call_id() {
        let msg = ChatMessage::tool_result("call_0", "File sent to the user successfully.");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_0"));
    }

    #[test]
    fn test_tool_call_string_arg() {
        let call = ToolCall {
            id: "call_0".into(),
            name: "execute_python".into(),
            arguments: json!({"code": "print(1)"}),
        };
        assert_eq!(call.string_arg("code"), Some("print(1)"));
        assert_eq!(call.string_arg("missing"), None);
    }

    #[test]
    fn test_append_text_to_system_message() {
        let mut msg = ChatMessage::system("Base prompt.");
        msg.append_text("\nThe user uploaded data.csv.");
        assert_eq!(
            msg.content.as_text(),
            Some("Base prompt.\nThe user uploaded data.csv.")
        );
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::Tool.as_str(), "tool");
    }
}
