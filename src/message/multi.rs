use std::any::Any;
use std::sync::Arc;

use super::{Message, MessageRef};

/// Several commands executed in order within one transaction.
///
/// Commands nested in a batch always run inside the batch transaction,
/// even when their own policy opts out of transactions.
#[derive(Debug, Clone, Default)]
pub struct MultiCommand {
    commands: Vec<MessageRef>,
}

impl MultiCommand {
    pub const TYPE_NAME: &'static str = "corebus.MultiCommand";

    pub fn new(commands: impl IntoIterator<Item = MessageRef>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }

    /// Append a concrete command.
    pub fn push<M: Message>(mut self, command: M) -> Self {
        self.commands.push(Arc::new(command));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageRef> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Message for MultiCommand {
    fn message_type(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
