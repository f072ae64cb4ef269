use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::message::MessageRef;
use crate::registry::HandlerReference;

/// Values injected into non-message parameters, by parameter name.
#[derive(Clone, Default)]
pub struct Arguments {
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.values.insert(name.into(), Arc::new(value));
        self
    }

    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Resolves extra handler arguments at call time.
///
/// Only consulted for references flagged `requires_argument_resolution`.
pub trait ArgumentResolver: Send + Sync {
    fn resolve(&self, reference: &HandlerReference, message: &MessageRef) -> Result<Arguments>;
}

impl<F> ArgumentResolver for F
where
    F: Fn(&HandlerReference, &MessageRef) -> Result<Arguments> + Send + Sync,
{
    fn resolve(&self, reference: &HandlerReference, message: &MessageRef) -> Result<Arguments> {
        self(reference, message)
    }
}
