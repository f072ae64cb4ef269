use std::fmt;

use serde::{Deserialize, Serialize};

/// One handler method eligible for a message type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerReference {
    pub message_type: String,
    pub handler_id: String,
    pub method_name: String,
    /// Parameter receiving the message.
    pub parameter_name: String,
    /// The method takes more than the message and needs argument injection.
    pub requires_argument_resolution: bool,
}

impl HandlerReference {
    pub fn new(
        message_type: impl Into<String>,
        handler_id: impl Into<String>,
        method_name: impl Into<String>,
        parameter_name: impl Into<String>,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            handler_id: handler_id.into(),
            method_name: method_name.into(),
            parameter_name: parameter_name.into(),
            requires_argument_resolution: false,
        }
    }

    pub fn with_argument_resolution(mut self, required: bool) -> Self {
        self.requires_argument_resolution = required;
        self
    }
}

impl fmt::Display for HandlerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]::{}()", self.handler_id, self.message_type, self.method_name)
    }
}
