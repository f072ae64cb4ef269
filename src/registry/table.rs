use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::error;

use super::{HandlerReference, HandlerResolver};
use crate::error::{BusError, Result};
use crate::message::{Message, TypeHierarchy};
use crate::types::HandlerDescriptor;

/// Message type to handler references.
///
/// Built once at startup, read-only afterwards. Command tables hold at
/// most one reference per exact type; event tables hold any number and
/// also match on the interfaces and ancestors of the message type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTable {
    allow_multiple: bool,
    supertype_matching: bool,
    references: BTreeMap<String, Vec<HandlerReference>>,
}

impl DispatchTable {
    pub fn new(allow_multiple: bool, supertype_matching: bool) -> Self {
        Self {
            allow_multiple,
            supertype_matching,
            references: BTreeMap::new(),
        }
    }

    /// One handler per command type, exact matching.
    pub fn commands() -> Self {
        Self::new(false, false)
    }

    /// Many listeners per event type, supertype matching.
    pub fn events() -> Self {
        Self::new(true, true)
    }

    /// Add a reference.
    ///
    /// On a single-handler table, a second reference for the same type is
    /// refused with both handlers named in the error.
    pub fn append(&mut self, reference: HandlerReference) -> Result<()> {
        let entries = self.references.entry(reference.message_type.clone()).or_default();

        if let Some(existing) = entries.first() {
            if !self.allow_multiple {
                error!(
                    message_type = %reference.message_type,
                    existing = %existing,
                    found = %reference,
                    "Duplicate command handler"
                );
                return Err(BusError::Configuration(format!(
                    "Handler for command class {} is already defined using {}::{}, found {}::{}",
                    reference.message_type,
                    existing.handler_id,
                    existing.method_name,
                    reference.handler_id,
                    reference.method_name
                )));
            }
        }

        entries.push(reference);
        Ok(())
    }

    /// Resolve a handler type and add all of its references.
    pub fn append_from(
        &mut self,
        resolver: &HandlerResolver<'_>,
        handler: &HandlerDescriptor,
        handler_id: &str,
    ) -> Result<()> {
        for reference in resolver.resolve(handler, handler_id)? {
            self.append(reference)?;
        }
        Ok(())
    }

    /// The handler for the exact type, if any.
    pub fn lookup_first(&self, message_type: &str) -> Option<&HandlerReference> {
        self.references.get(message_type).and_then(|refs| refs.first())
    }

    /// Every reference matching the hierarchy.
    ///
    /// Without supertype matching only the exact type is considered.
    /// Otherwise interfaces come first, then the type and its ancestors.
    /// A reference reached through several keys is returned once.
    pub fn lookup_all(&self, hierarchy: &TypeHierarchy<'_>) -> Vec<&HandlerReference> {
        let keys = if self.supertype_matching {
            hierarchy.candidates()
        } else {
            vec![hierarchy.type_name]
        };

        let mut found: Vec<&HandlerReference> = Vec::new();
        for key in keys {
            for reference in self.references.get(key).into_iter().flatten() {
                if !found.contains(&reference) {
                    found.push(reference);
                }
            }
        }
        found
    }

    pub fn lookup_all_for(&self, message: &dyn Message) -> Vec<&HandlerReference> {
        self.lookup_all(&TypeHierarchy {
            type_name: message.message_type(),
            interfaces: message.interfaces(),
            ancestors: message.ancestors(),
        })
    }

    pub fn len(&self) -> usize {
        self.references.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.references.keys().map(String::as_str)
    }

    /// Compact binary form, for a startup cache.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bitcode::serialize(self)
            .map_err(|e| BusError::Configuration(format!("cannot encode dispatch table: {}", e)))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bitcode::deserialize(bytes)
            .map_err(|e| BusError::Configuration(format!("cannot decode dispatch table: {}", e)))
    }

    /// Human readable dump.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BusError::Configuration(format!("cannot dump dispatch table: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BusError::Configuration(format!("cannot load dispatch table: {}", e)))
    }
}
