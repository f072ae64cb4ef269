//! Handler registry - resolves handler methods into a dispatch table.
//!
//! ```text
//! HandlerDescriptor ──► HandlerResolver ──► HandlerReference* ──► DispatchTable
//!   (methods, params)     (binding rules)                        (lookup_first / lookup_all)
//! ```

mod reference;
mod resolver;
mod table;

pub use reference::HandlerReference;
pub use resolver::HandlerResolver;
pub use table::DispatchTable;
