use darling::{Error, FromDeriveInput as _};
use proc_macro2::TokenStream;
use quote::quote;

use crate::args::{ContainerMeta, FieldMeta};

enum FieldKind {
    Value,
    Object,
    Reference,
}

pub fn entry_point(input: syn::DeriveInput) -> darling::Result<TokenStream> {
    let mut acc = Error::accumulator();

    let Some(container) = acc.handle(ContainerMeta::from_derive_input(&input)) else {
        return finish_as_error(acc);
    };

    // `supports(struct_named)` on `ContainerMeta` already rejected anything
    // else before `from_derive_input` returned `Ok`.
    let darling::ast::Data::Struct(raw_fields) = container.data else {
        unreachable!("ContainerMeta::from_derive_input only succeeds for named structs")
    };
    let raw_fields = raw_fields.fields;

    let mut identity_field = None;
    let mut declarator_field = None;
    let mut published = Vec::new();

    for field in &raw_fields {
        let Some(ident) = field.ident.as_ref() else {
            acc.push(Error::custom("`Publish` requires named fields").with_span(&field.ty));
            continue;
        };

        if field.identity {
            if identity_field.replace(ident).is_some() {
                acc.push(Error::custom("only one field may be `#[publish(identity)]`").with_span(ident));
            }
            continue;
        }
        if field.declarator {
            if declarator_field.replace(ident).is_some() {
                acc.push(Error::custom("only one field may be `#[publish(declarator)]`").with_span(ident));
            }
            continue;
        }
        if field.skip {
            continue;
        }

        let kind = match (field.object, field.reference) {
            (true, true) => {
                acc.push(
                    Error::custom("a field cannot be both `object` and `reference`").with_span(ident),
                );
                FieldKind::Value
            },
            (true, false) => FieldKind::Object,
            (false, true) => FieldKind::Reference,
            (false, false) => FieldKind::Value,
        };

        let name = field.rename.clone().unwrap_or_else(|| ident.to_string());
        published.push((ident, &field.ty, kind, name, field.readonly));
    }

    let Some(identity_field) = identity_field else {
        acc.push(Error::custom(
            "`Publish` requires exactly one `#[publish(identity)]` field of type `DeclaratorId`",
        ));
        return finish_as_error(acc);
    };
    let Some(declarator_field) = declarator_field else {
        acc.push(Error::custom(
            "`Publish` requires exactly one `#[publish(declarator)]` field of type `RefCell<DeclaratorId>`",
        ));
        return finish_as_error(acc);
    };

    acc.finish()?;

    let ty_name = &container.ident;
    let class_name = container.class.unwrap_or_else(|| ty_name.to_string());

    let publications = published.iter().map(|(_, ty, kind, name, readonly)| {
        let access = match kind {
            FieldKind::Value if *readonly => quote!(::istree::descriptor::Access::ReadOnly),
            _ => quote!(::istree::descriptor::Access::ReadWrite),
        };
        match kind {
            FieldKind::Value => quote! {
                ::istree::descriptor::Descriptor::new(
                    #name.to_owned(),
                    <#ty as ::istree::value::PropertyValue>::RTTI,
                    #access,
                    ::istree::descriptor::PublicationShape::Value,
                )
            },
            FieldKind::Object => quote! {
                ::istree::descriptor::Descriptor::new(
                    #name.to_owned(),
                    ::istree::rtti::Rtti::scalar(::istree::rtti::Kind::Object),
                    #access,
                    ::istree::descriptor::PublicationShape::Object,
                )
            },
            FieldKind::Reference => quote! {
                ::istree::descriptor::Descriptor::new(
                    #name.to_owned(),
                    ::istree::rtti::Rtti::scalar(::istree::rtti::Kind::Object),
                    #access,
                    ::istree::descriptor::PublicationShape::Object,
                )
            },
        }
    });

    let read_value_arms = published.iter().enumerate().filter_map(|(i, (ident, _, kind, ..))| {
        matches!(kind, FieldKind::Value).then(|| {
            quote! {
                #i => ::std::option::Option::Some(::istree::value::PropertyValue::into_value(
                    ::std::clone::Clone::clone(&self.#ident),
                )),
            }
        })
    });

    let read_object_arms = published.iter().enumerate().filter_map(|(i, (ident, _, kind, ..))| {
        match kind {
            FieldKind::Object => Some(quote! {
                #i => ::std::option::Option::Some(::istree::publisher::ObjectView::Owned(
                    &self.#ident as &dyn ::istree::publisher::Publisher,
                )),
            }),
            FieldKind::Reference => Some(quote! {
                #i => ::std::option::Option::Some(::istree::publisher::ObjectView::Reference {
                    class_name: ::istree::reference::RefSlot::type_name(&self.#ident),
                    id: ::istree::reference::RefSlot::current_id(&self.#ident),
                }),
            }),
            FieldKind::Value => None,
        }
    });

    let write_value_arms = published.iter().filter_map(|(ident, _, kind, name, readonly)| {
        match kind {
            FieldKind::Value if *readonly => Some(quote! {
                #name => ::std::result::Result::Err(::istree::error::Error::custom(
                    ::std::format!("property `{}` is read-only", #name),
                )),
            }),
            FieldKind::Value => Some(quote! {
                #name => {
                    self.#ident = ::istree::value::PropertyValue::from_value(value)?;
                    ::std::result::Result::Ok(true)
                },
            }),
            FieldKind::Object | FieldKind::Reference => None,
        }
    });

    let object_mut_arms = published.iter().filter_map(|(ident, _, kind, name, _)| match kind {
        FieldKind::Object => Some(quote! {
            #name => {
                let owner = ::istree::publisher::Publisher::identity(self);
                ::istree::publisher::Publisher::set_declarator(&mut self.#ident, owner);
                ::std::option::Option::Some(::istree::publisher::ObjectSlotMut::Owned(&mut self.#ident))
            },
        }),
        FieldKind::Reference => Some(quote! {
            #name => ::std::option::Option::Some(::istree::publisher::ObjectSlotMut::Reference(
                &mut self.#ident as &mut dyn ::istree::reference::RefSlot,
            )),
        }),
        FieldKind::Value => None,
    });

    Ok(quote! {
        #[automatically_derived]
        impl ::istree::publisher::Publisher for #ty_name {
            fn class_name(&self) -> &str {
                #class_name
            }

            fn identity(&self) -> ::istree::declarator::DeclaratorId {
                ::std::clone::Clone::clone(&self.#identity_field)
            }

            fn declarator(&self) -> ::istree::declarator::DeclaratorId {
                self.#declarator_field.borrow().clone()
            }

            fn set_declarator(&mut self, id: ::istree::declarator::DeclaratorId) {
                *self.#declarator_field.borrow_mut() = id;
            }

            fn publications(&self) -> ::std::vec::Vec<::istree::descriptor::Descriptor> {
                ::std::vec![ #( #publications ),* ]
            }

            fn read_value(&self, index: usize) -> ::std::option::Option<::istree::value::Value> {
                match index {
                    #( #read_value_arms )*
                    _ => ::std::option::Option::None,
                }
            }

            fn read_object(&self, index: usize) -> ::std::option::Option<::istree::publisher::ObjectView<'_>> {
                match index {
                    #( #read_object_arms )*
                    _ => ::std::option::Option::None,
                }
            }

            fn write_value(&mut self, name: &str, value: ::istree::value::Value) -> ::istree::error::Result<bool> {
                match name {
                    #( #write_value_arms )*
                    _ => ::std::result::Result::Ok(false),
                }
            }

            fn object_mut(&mut self, name: &str) -> ::std::option::Option<::istree::publisher::ObjectSlotMut<'_>> {
                match name {
                    #( #object_mut_arms )*
                    _ => ::std::option::Option::None,
                }
            }
        }
    })
}

fn finish_as_error<T>(acc: darling::error::Accumulator) -> darling::Result<T> {
    Err(Error::multiple(acc.into_inner()))
}
