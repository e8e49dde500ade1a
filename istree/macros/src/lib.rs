//! Proc macros for the `istree` crate.

use proc_macro::TokenStream as StdTokenStream;
use syn::DeriveInput;

mod args;
mod derive_publish;

/// Derives `istree::publisher::Publisher` from a struct's fields.
///
/// Exactly one field must be `#[publish(identity)]` (type `DeclaratorId`) and
/// exactly one `#[publish(declarator)]` (type `RefCell<DeclaratorId>`); every
/// other named field is published under its own name unless marked
/// `#[publish(skip)]` or `#[publish(rename = "...")]`. A field whose type
/// implements `Publisher` needs `#[publish(object)]` to be recursed into as
/// an owned sub-object; a `Ref<T>` field needs `#[publish(reference)]` to be
/// serialized by registry id instead.
#[proc_macro_derive(Publish, attributes(publish))]
pub fn derive_publish(input: StdTokenStream) -> StdTokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    derive_publish::entry_point(input)
        .unwrap_or_else(|e| e.write_errors())
        .into()
}
