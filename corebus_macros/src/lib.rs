mod message;

use proc_macro::TokenStream;

/// Derive `corebus::Message` and `corebus::MessageType`.
///
/// # Usage
///
/// ```ignore
/// #[derive(Debug, Clone, Message)]
/// #[message(
///     name = "shop.OrderPlaced",
///     implements("shop.OrderEvent"),
///     extends("shop.DomainEvent"),
///     command_as_event,
///     no_transaction,
///     retry = 4,
///     routing_key = "orders"
/// )]
/// struct OrderPlaced { order_id: String }
/// ```
///
/// Every key is optional. Without `name`, the type name is
/// `module::path::TypeName`.
#[proc_macro_derive(Message, attributes(message))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    message::derive_message(input)
}
