use darling::ast::Data;
use darling::util::Ignored;
use syn::{Ident, Type};

/// Per-field `#[publish(...)]` attribute contents, plus the magic `ident`/
/// `ty` fields darling populates from the struct definition itself.
#[derive(Debug, darling::FromField)]
#[darling(attributes(publish))]
pub struct FieldMeta {
    pub ident: Option<Ident>,
    pub ty: Type,

    /// Excludes the field from `publications()` entirely.
    #[darling(default)]
    pub skip: bool,
    /// Publishes under a different name than the field's own identifier.
    pub rename: Option<String>,
    /// The field is an owned sub-object (its type implements `Publisher`),
    /// recursed into rather than read as a plain value.
    #[darling(default)]
    pub object: bool,
    /// The field is a `Ref<T>`: serialized by registry id, not recursed into.
    #[darling(default)]
    pub reference: bool,
    /// This field backs `Publisher::identity`; its type must be `DeclaratorId`.
    #[darling(default)]
    pub identity: bool,
    /// This field backs `Publisher::declarator`/`set_declarator`; its type
    /// must be `RefCell<DeclaratorId>`.
    #[darling(default)]
    pub declarator: bool,
    /// Value-shaped fields only: publishes as read-only (no `write_value`
    /// branch is generated for it).
    #[darling(default)]
    pub readonly: bool,
}

/// Container-level `#[publish(...)]` attribute contents.
#[derive(Debug, darling::FromDeriveInput)]
#[darling(attributes(publish), supports(struct_named))]
pub struct ContainerMeta {
    pub ident: Ident,
    pub data: Data<Ignored, FieldMeta>,
    /// Overrides `Publisher::class_name`; defaults to the struct's own name.
    pub class: Option<String>,
}
