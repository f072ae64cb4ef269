use std::collections::HashSet;

use tracing::debug;

use super::HandlerReference;
use crate::error::{BusError, Result};
use crate::types::{HandlerDescriptor, HandlerKind, MethodDescriptor, TypeCatalog, OBJECT_TYPE};

/// Finds command handler or event listener methods on a handler type.
///
/// Slow compared to a table lookup; meant to run once at startup, with the
/// resulting [`DispatchTable`](super::DispatchTable) kept for dispatch.
pub struct HandlerResolver<'a> {
    catalog: &'a TypeCatalog,
    kind: Option<HandlerKind>,
}

impl<'a> HandlerResolver<'a> {
    /// Resolver accepting both command and listener attributes.
    pub fn new(catalog: &'a TypeCatalog) -> Self {
        Self { catalog, kind: None }
    }

    pub fn commands(catalog: &'a TypeCatalog) -> Self {
        Self {
            catalog,
            kind: Some(HandlerKind::Command),
        }
    }

    pub fn listeners(catalog: &'a TypeCatalog) -> Self {
        Self {
            catalog,
            kind: Some(HandlerKind::Listener),
        }
    }

    /// Resolve every handler method of `handler`, identified as `handler_id`.
    pub fn resolve(&self, handler: &HandlerDescriptor, handler_id: &str) -> Result<Vec<HandlerReference>> {
        let register_all = match (handler.register_all, self.kind) {
            (Some(_), None) => true,
            (Some(declared), Some(wanted)) => declared == wanted,
            (None, _) => false,
        };

        let mut references = Vec::new();
        for method in &handler.methods {
            if !method.public || method.is_static || method.is_constructor {
                continue;
            }
            // Inherited methods are registered through their declaring type.
            if matches!(&method.declared_in, Some(owner) if *owner != handler.type_name) {
                continue;
            }

            let mut targets: HashSet<String> = HashSet::new();
            let mut attributed = false;
            for attribute in &method.attributes {
                if self.kind.is_some_and(|kind| kind != attribute.kind) {
                    continue;
                }
                attributed = true;

                let reference = self.bind(method, handler_id, attribute.target.as_deref())?;
                if !targets.insert(reference.message_type.clone()) {
                    return Err(BusError::Configuration(format!(
                        "Method '{}()' target type '{}' is defined more than once.",
                        method.name, reference.message_type
                    )));
                }
                references.push(reference);
            }

            if !attributed && register_all {
                match self.bind(method, handler_id, None) {
                    Ok(reference) => references.push(reference),
                    Err(e) => {
                        debug!(handler = handler_id, method = %method.name, error = %e, "Skipping method");
                    }
                }
            }
        }

        Ok(references)
    }

    fn bind(&self, method: &MethodDescriptor, handler_id: &str, target: Option<&str>) -> Result<HandlerReference> {
        let total = method.parameters.len();
        let reference = |message_type: &str, parameter: &str| -> HandlerReference {
            HandlerReference::new(message_type, handler_id, method.name.as_str(), parameter)
                .with_argument_resolution(total != 1)
        };

        let mut typed: Vec<(&str, Vec<&str>)> = Vec::new();
        let mut bound: Option<&str> = None;

        for parameter in &method.parameters {
            let types: Vec<&str> = parameter.named_types().collect();
            if types.is_empty() {
                continue;
            }

            if let Some(target) = target {
                if self.compatible(&types, target) {
                    if let Some(previous) = bound {
                        return Err(BusError::Configuration(format!(
                            "Method '{}()' has more than one parameter matching the given target type '{}' ('{}' and '{}').",
                            method.name, target, previous, parameter.name
                        )));
                    }
                    bound = Some(parameter.name.as_str());
                }
            }
            typed.push((parameter.name.as_str(), types));
        }

        if let (Some(target), Some(parameter)) = (target, bound) {
            self.require_type(target)?;
            return Ok(reference(target, parameter));
        }

        if typed.is_empty() {
            return Err(BusError::Configuration(format!(
                "Method '{}()' has no class or interface typed parameters, you must specify a target type on the target parameter.",
                method.name
            )));
        }

        let candidate = match target {
            None => {
                if typed.len() != 1 {
                    return Err(BusError::Configuration(format!(
                        "Method '{}()' has more than one parameter, target type is not specified, you must specify at least the target parameter type or name.",
                        method.name
                    )));
                }
                typed.first()
            }
            // No type matched, fall back on the parameter name.
            Some(target) => typed.iter().find(|(name, _)| *name == target),
        };

        match candidate {
            Some((parameter, types)) => {
                if types.len() > 1 {
                    return Err(BusError::Configuration(format!(
                        "Method '{}()' parameter '{}' has more than one eligible types, using union types is unsupported.",
                        method.name, parameter
                    )));
                }
                let message_type = types[0];
                self.require_type(message_type)?;
                Ok(reference(message_type, *parameter))
            }
            None => Err(BusError::Configuration(format!(
                "Method '{}()' user given target '{}' is neither an argument type or a parameter name.",
                method.name,
                target.unwrap_or_default()
            ))),
        }
    }

    /// Whether a parameter declared with `types` can receive `target`.
    fn compatible(&self, types: &[&str], target: &str) -> bool {
        if target == OBJECT_TYPE {
            return false;
        }
        if types.contains(&target) {
            return true;
        }
        // Unknown names are most likely parameter names.
        if !self.catalog.exists(target) {
            return false;
        }

        types.iter().any(|declared| self.catalog.is_subtype(target, declared))
    }

    fn require_type(&self, name: &str) -> Result<()> {
        if name == OBJECT_TYPE || !self.catalog.exists(name) {
            return Err(BusError::Configuration(format!(
                "Type '{}' is not a class or an interface.",
                name
            )));
        }
        Ok(())
    }
}
