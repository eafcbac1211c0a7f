// Typed function-schema builder, validated before any request is sent.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Error;

/// JSON-schema primitive types accepted for function parameters.
const VALID_PARAMETER_KINDS: &[&str] =
    &["string", "number", "integer", "boolean", "array", "object"];

/// One declared parameter of a callable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// JSON-schema type string, e.g. `"string"` or `"number"`.
    pub kind: String,
    pub description: String,
}

/// A function the assistant may signal a call to.
///
/// Declared once per session, immutable, and sent unchanged with every
/// request. `validate()` rejects malformed specs before they reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Builder-style: declare a parameter.
    pub fn parameter(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            kind: kind.into(),
            description: description.into(),
        });
        self
    }

    /// Validate the spec: function name must match `[a-zA-Z][a-zA-Z0-9_]{0,63}`,
    /// parameter types must be JSON-schema primitives, and parameter names
    /// must be unique.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() || self.name.len() > 64 {
            return Err(Error::invalid_request(format!(
                "function name '{}' must be 1-64 characters",
                self.name
            )));
        }
        let name_ok = self.name.chars().enumerate().all(|(i, c)| {
            if i == 0 {
                c.is_ascii_alphabetic()
            } else {
                c.is_ascii_alphanumeric() || c == '_'
            }
        });
        if !name_ok {
            return Err(Error::invalid_request(format!(
                "function name '{}' must match [a-zA-Z][a-zA-Z0-9_]{{0,63}}",
                self.name
            )));
        }

        for param in &self.parameters {
            if param.name.is_empty() {
                return Err(Error::invalid_request(format!(
                    "function '{}' declares a parameter with an empty name",
                    self.name
                )));
            }
            if !VALID_PARAMETER_KINDS.contains(&param.kind.as_str()) {
                return Err(Error::invalid_request(format!(
                    "parameter '{}' of function '{}' has unknown type '{}'",
                    param.name, self.name, param.kind
                )));
            }
            let occurrences = self
                .parameters
                .iter()
                .filter(|p| p.name == param.name)
                .count();
            if occurrences > 1 {
                return Err(Error::invalid_request(format!(
                    "function '{}' declares parameter '{}' more than once",
                    self.name, param.name
                )));
            }
        }

        Ok(())
    }

    /// Serialize to the wire shape expected by chat-completion endpoints:
    /// `{"name", "description", "parameters": {"type": "object", "properties": {...}}}`.
    pub fn to_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.kind,
                    "description": param.description,
                }),
            );
        }
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
            },
        })
    }
}
