use crate::error::Error;
use crate::message::Message;
use crate::schema::FunctionSpec;

/// One completion request: the ordered message list, an optional function
/// schema list, a max-token budget, and the target deployment identifier.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub deployment: String,
    pub messages: Vec<Message>,
    pub functions: Option<Vec<FunctionSpec>>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Validate the minimum required fields and every declared function spec.
    pub fn validate(&self) -> Result<(), Error> {
        if self.deployment.trim().is_empty() {
            return Err(Error::invalid_request(
                "request deployment must not be empty",
            ));
        }
        if self.messages.is_empty() {
            return Err(Error::invalid_request("request messages must not be empty"));
        }
        if let Some(functions) = &self.functions {
            for spec in functions {
                spec.validate()?;
            }
        }
        Ok(())
    }

    /// Builder-style setter for deployment.
    pub fn deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    /// Builder-style setter for messages.
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Builder-style setter for functions.
    pub fn functions(mut self, functions: Vec<FunctionSpec>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Builder-style setter for max_tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
