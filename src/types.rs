//! Type catalog and handler descriptors.
//!
//! Handler discovery works on explicit descriptions instead of runtime
//! reflection: a handler type lists its methods and their parameters,
//! and the catalog knows which names are classes or interfaces and how
//! they relate.

use std::collections::HashMap;

use crate::message::MessageType;

/// Catch-all pseudo type that never binds a handler.
pub const OBJECT_TYPE: &str = "object";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    /// Parent class for classes, extended interfaces for interfaces.
    pub parents: Vec<String>,
    /// Implemented interfaces (classes only).
    pub interfaces: Vec<String>,
}

impl TypeDescriptor {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            parents: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }
}

/// Known classes and interfaces.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Register a derived message type along with the supertypes it declares.
    ///
    /// Declared interfaces and ancestors are added as bare entries when the
    /// catalog does not know them yet. The ancestor chain is linked nearest
    /// first.
    pub fn register<M: MessageType>(&mut self) -> &mut Self {
        let mut chain = std::iter::once(M::TYPE_NAME).chain(M::ANCESTORS.iter().copied()).peekable();
        while let Some(name) = chain.next() {
            let entry = self
                .types
                .entry(name.to_string())
                .or_insert_with(|| TypeDescriptor::class(name));
            if let Some(parent) = chain.peek() {
                if !entry.parents.iter().any(|p| p == parent) {
                    entry.parents.push(parent.to_string());
                }
            }
        }

        for interface in M::INTERFACES {
            self.types
                .entry(interface.to_string())
                .or_insert_with(|| TypeDescriptor::interface(*interface));
        }
        if let Some(entry) = self.types.get_mut(M::TYPE_NAME) {
            for interface in M::INTERFACES {
                if !entry.interfaces.iter().any(|i| i == interface) {
                    entry.interfaces.push(interface.to_string());
                }
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn is_interface(&self, name: &str) -> bool {
        matches!(self.get(name), Some(t) if t.kind == TypeKind::Interface)
    }

    /// Whether `child` is, extends or implements `parent`, transitively.
    pub fn is_subtype(&self, child: &str, parent: &str) -> bool {
        if child == parent {
            return true;
        }

        let mut seen: Vec<&str> = Vec::new();
        let mut pending: Vec<&str> = vec![child];
        while let Some(current) = pending.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);

            let Some(descriptor) = self.get(current) else {
                continue;
            };
            for next in descriptor.parents.iter().chain(descriptor.interfaces.iter()) {
                if next == parent {
                    return true;
                }
                pending.push(next.as_str());
            }
        }
        false
    }
}

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Scalar or pseudo type (`int`, `string`, `object`, ...).
    Builtin(String),
    /// Class or interface name.
    Named(String),
}

impl ParamType {
    pub fn named(name: impl Into<String>) -> Self {
        ParamType::Named(name.into())
    }

    pub fn builtin(name: impl Into<String>) -> Self {
        ParamType::Builtin(name.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    /// More than one entry means a union type. Empty means untyped.
    pub types: Vec<ParamType>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, types: Vec<ParamType>) -> Self {
        Self {
            name: name.into(),
            types,
        }
    }

    /// Parameter typed with a single class or interface.
    pub fn named(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, vec![ParamType::named(type_name)])
    }

    pub fn builtin(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, vec![ParamType::builtin(type_name)])
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Class and interface names this parameter accepts.
    pub fn named_types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().filter_map(|t| match t {
            ParamType::Named(name) => Some(name.as_str()),
            ParamType::Builtin(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Command,
    Listener,
}

/// Handler policy metadata attached to a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerAttribute {
    pub kind: HandlerKind,
    pub target: Option<String>,
}

impl HandlerAttribute {
    pub fn command() -> Self {
        Self {
            kind: HandlerKind::Command,
            target: None,
        }
    }

    pub fn listener() -> Self {
        Self {
            kind: HandlerKind::Listener,
            target: None,
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub public: bool,
    pub is_static: bool,
    pub is_constructor: bool,
    /// Declaring type when inherited from a parent. `None` means declared
    /// on the handler type itself.
    pub declared_in: Option<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub attributes: Vec<HandlerAttribute>,
}

impl MethodDescriptor {
    /// Public instance method declared on the handler type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: true,
            is_static: false,
            is_constructor: false,
            declared_in: None,
            parameters: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn param(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn attribute(mut self, attribute: HandlerAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn constructor(mut self) -> Self {
        self.is_constructor = true;
        self
    }

    pub fn inherited_from(mut self, parent: impl Into<String>) -> Self {
        self.declared_in = Some(parent.into());
        self
    }
}

/// A handler type and its methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub type_name: String,
    /// Every eligible public method is a handler of this kind.
    pub register_all: Option<HandlerKind>,
    pub methods: Vec<MethodDescriptor>,
}

impl HandlerDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            register_all: None,
            methods: Vec::new(),
        }
    }

    pub fn register_all(mut self, kind: HandlerKind) -> Self {
        self.register_all = Some(kind);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}
