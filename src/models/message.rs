use serde::{Deserialize, Serialize};

use super::content::{AudioFormat, Content, ContentPart, ImageRef};
use super::tool::ToolCall;

/// Provider-neutral role vocabulary. Individual adapters may alias roles
/// together or rename them on the wire; the mapping lives in the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
    Developer,
}

impl ChatRole {
    pub const ALL: [ChatRole; 5] = [
        ChatRole::System,
        ChatRole::User,
        ChatRole::Assistant,
        ChatRole::Tool,
        ChatRole::Developer,
    ];
}

/// A message to or from a model.
///
/// Messages are assembled with the builder helpers, sent as-is, and never
/// mutated afterwards except while a streaming response is still arriving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Set on Tool-role messages to tie the result back to its call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub created: i64,
}

impl ChatMessage {
    fn new(role: ChatRole) -> Self {
        ChatMessage {
            role,
            content: Content::Parts(Vec::new()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
            created: chrono::Utc::now().timestamp(),
        }
    }

    pub fn system() -> Self {
        Self::new(ChatRole::System)
    }

    pub fn user() -> Self {
        Self::new(ChatRole::User)
    }

    pub fn assistant() -> Self {
        Self::new(ChatRole::Assistant)
    }

    pub fn developer() -> Self {
        Self::new(ChatRole::Developer)
    }

    /// A tool-result message answering the call with the given id.
    pub fn tool<S: Into<String>>(tool_call_id: S) -> Self {
        let mut message = Self::new(ChatRole::Tool);
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Replace the content wholesale.
    pub fn with_content<C: Into<Content>>(mut self, content: C) -> Self {
        self.content = content.into();
        self
    }

    /// Append a part, converting bare-string content into parts first.
    pub fn with_part(mut self, part: ContentPart) -> Self {
        let mut parts = match self.content {
            Content::Text(text) if text.is_empty() => Vec::new(),
            Content::Text(text) => vec![ContentPart::text(text)],
            Content::Parts(parts) => parts,
        };
        parts.push(part);
        self.content = Content::Parts(parts);
        self
    }

    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_part(ContentPart::text(text))
    }

    pub fn with_image(self, image: ImageRef) -> Self {
        self.with_part(ContentPart::image(image))
    }

    pub fn with_audio<S: Into<String>>(self, data: S, format: AudioFormat) -> Self {
        self.with_part(ContentPart::audio(data, format))
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    pub fn text(&self) -> String {
        self.content.all_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_roles() {
        assert_eq!(ChatMessage::user().role, ChatRole::User);
        assert_eq!(ChatMessage::system().role, ChatRole::System);
        assert_eq!(
            ChatMessage::tool("call_9").tool_call_id.as_deref(),
            Some("call_9")
        );
    }

    #[test]
    fn test_with_part_promotes_string_content() {
        let message = ChatMessage::user()
            .with_content("look at this")
            .with_image(ImageRef::url("https://x/y.png"));

        match &message.content {
            Content::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0].as_text(), Some("look at this"));
            }
            _ => panic!("Expected parts"),
        }
    }

    #[test]
    fn test_text_gathers_all_runs() {
        let message = ChatMessage::assistant().with_text("a").with_text("b");
        assert_eq!(message.text(), "ab");
    }

    #[test]
    fn test_role_wire_serialization() {
        let json = serde_json::to_value(ChatRole::Developer).unwrap();
        assert_eq!(json, serde_json::json!("developer"));
    }
}
