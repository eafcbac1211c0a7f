use serde::{Deserialize, Serialize};

/// The three roles a conversational message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A function-call signal emitted by the assistant: a name plus a
/// JSON-encoded argument payload, in lieu of free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// The fundamental unit of conversation.
///
/// For assistant-produced entries exactly one of `content` / `function_call`
/// is meaningful; user and system messages always carry `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    /// Convenience: create a system message from text.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            function_call: None,
        }
    }

    /// Convenience: create a user message from text.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            function_call: None,
        }
    }

    /// Convenience: create an assistant message from text.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            function_call: None,
        }
    }

    /// Convenience: create an assistant message signaling a function call.
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }

    pub fn is_function_call(&self) -> bool {
        self.function_call.is_some()
    }
}
