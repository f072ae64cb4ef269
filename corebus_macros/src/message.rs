use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parenthesized, DeriveInput, LitInt, LitStr, Token};

#[derive(Default)]
struct MessageAttrs {
    name: Option<LitStr>,
    implements: Vec<LitStr>,
    extends: Vec<LitStr>,
    no_transaction: bool,
    command_as_event: bool,
    retry: Option<u32>,
    routing_key: Option<LitStr>,
}

pub fn derive_message(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let attrs = parse_attrs(input)?;

    let type_name = match &attrs.name {
        Some(name) => quote! { #name },
        None => quote! { concat!(module_path!(), "::", stringify!(#ident)) },
    };
    let interfaces = &attrs.implements;
    let ancestors = &attrs.extends;

    // MessagePolicy builders are const fns, chained here into a const.
    let mut policy = quote! { ::corebus::MessagePolicy::new() };
    if attrs.no_transaction {
        policy = quote! { #policy.no_transaction() };
    }
    if attrs.command_as_event {
        policy = quote! { #policy.command_as_event() };
    }
    if let Some(count) = attrs.retry {
        policy = quote! { #policy.retry(#count) };
    }
    if let Some(key) = &attrs.routing_key {
        policy = quote! { #policy.routing_key(#key) };
    }

    Ok(quote! {
        impl #impl_generics ::corebus::MessageType for #ident #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            const INTERFACES: &'static [&'static str] = &[#(#interfaces),*];
            const ANCESTORS: &'static [&'static str] = &[#(#ancestors),*];
            const POLICY: ::corebus::MessagePolicy = #policy;
        }

        impl #impl_generics ::corebus::Message for #ident #ty_generics #where_clause {
            fn message_type(&self) -> &'static str {
                <Self as ::corebus::MessageType>::TYPE_NAME
            }

            fn interfaces(&self) -> &'static [&'static str] {
                <Self as ::corebus::MessageType>::INTERFACES
            }

            fn ancestors(&self) -> &'static [&'static str] {
                <Self as ::corebus::MessageType>::ANCESTORS
            }

            fn policy(&self) -> ::corebus::MessagePolicy {
                <Self as ::corebus::MessageType>::POLICY
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    })
}

fn parse_attrs(input: &DeriveInput) -> syn::Result<MessageAttrs> {
    let mut attrs = MessageAttrs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("message") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                attrs.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("implements") {
                attrs.implements.extend(parse_str_list(&meta)?);
            } else if meta.path.is_ident("extends") {
                attrs.extends.extend(parse_str_list(&meta)?);
            } else if meta.path.is_ident("no_transaction") {
                attrs.no_transaction = true;
            } else if meta.path.is_ident("command_as_event") {
                attrs.command_as_event = true;
            } else if meta.path.is_ident("retry") {
                let count: LitInt = meta.value()?.parse()?;
                attrs.retry = Some(count.base10_parse()?);
            } else if meta.path.is_ident("routing_key") {
                attrs.routing_key = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported message attribute"));
            }
            Ok(())
        })?;
    }

    Ok(attrs)
}

fn parse_str_list(meta: &syn::meta::ParseNestedMeta) -> syn::Result<Vec<LitStr>> {
    let content;
    parenthesized!(content in meta.input);
    let list = content.parse_terminated(|input| input.parse::<LitStr>(), Token![,])?;
    Ok(list.into_iter().collect())
}
