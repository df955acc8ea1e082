//! IddObject derive macro implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, GenericArgument, Lifetime, PathArguments, Type};

use crate::parse::{parse_idd_object, IddFieldArgs, IddObjectArgs};

/// How a field's value crosses the workspace API
enum ValueKind {
    Double,
    Int,
    Bool,
    Text,
    /// Object reference to another façade type
    Reference(Type),
}

/// Single generic argument of `Wrapper<T>` if the last path segment is `wrapper`
fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == wrapper {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return Some(inner);
                    }
                }
            }
        }
    }
    None
}

/// Extract the inner type from `PhantomData<T>` if present, otherwise return the type as-is
fn extract_inner_type(ty: &Type) -> &Type {
    generic_inner(ty, "PhantomData").unwrap_or(ty)
}

/// Check if a type is PhantomData
fn is_phantom_data(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "PhantomData";
        }
    }
    false
}

/// Split `Option<T>` into `(T, true)`, anything else into `(ty, false)`
fn classify(ty: &Type) -> (ValueKind, bool) {
    let (inner, optional) = match generic_inner(ty, "Option") {
        Some(inner) => (inner, true),
        None => (ty, false),
    };

    let ident = match inner {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    };
    let kind = match ident.as_deref() {
        Some("f64") => ValueKind::Double,
        Some("i32") => ValueKind::Int,
        Some("bool") => ValueKind::Bool,
        Some("String") => ValueKind::Text,
        _ => ValueKind::Reference(inner.clone()),
    };
    (kind, optional)
}

/// Generate the IddObject implementation
pub fn derive_idd_object(input: DeriveInput) -> TokenStream {
    match parse_idd_object(&input) {
        Ok(args) => generate_impl(args),
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: IddObjectArgs) -> TokenStream {
    let Some(lifetime) = args.workspace_lifetime().cloned() else {
        return syn::Error::new_spanned(
            &args.ident,
            "IddObject structs need a workspace lifetime, e.g. `struct Zone<'w>`",
        )
        .to_compile_error();
    };

    let struct_name = &args.ident;
    let object_type = &args.object_type;
    let (impl_generics, ty_generics, where_clause) = args.generics.split_for_impl();

    // Get fields
    let fields = match &args.data {
        darling::ast::Data::Struct(fields) => &fields.fields,
        _ => {
            return syn::Error::new_spanned(
                &args.ident,
                "IddObject can only be derived for structs",
            )
            .to_compile_error()
        }
    };

    if !fields.iter().any(|f| f.is_named("ws")) || !fields.iter().any(|f| f.is_named("handle")) {
        return syn::Error::new_spanned(
            &args.ident,
            "IddObject structs need `ws: &Workspace` and `handle: Handle` fields",
        )
        .to_compile_error();
    }

    let accessors: Vec<_> = fields
        .iter()
        .filter(|f| f.is_idd_field())
        .map(|f| generate_accessors(f, &lifetime))
        .collect();

    let constants = generate_constants(object_type, fields);
    let constructors = generate_constructors(&lifetime);
    let model_object_impl = generate_model_object_impl(&args, fields, &lifetime);

    quote! {
        impl #impl_generics #struct_name #ty_generics #where_clause {
            #constants
            #constructors

            /// Index of a field of this type in the workspace's registry
            fn idd_field_index(&self, field: &str) -> usize {
                self.ws
                    .field_index(Self::IDD_OBJECT_TYPE, field)
                    .expect(concat!("Field missing from schema of ", #object_type))
            }

            #(#accessors)*
        }

        #model_object_impl

        impl #impl_generics ::std::cmp::PartialEq for #struct_name #ty_generics #where_clause {
            fn eq(&self, other: &Self) -> bool {
                ::std::ptr::eq(self.ws, other.ws) && self.handle == other.handle
            }
        }

        impl #impl_generics ::std::fmt::Debug for #struct_name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!(#struct_name))
                    .field("handle", &self.handle)
                    .finish()
            }
        }
    }
}

fn generate_accessors(field: &IddFieldArgs, lifetime: &Lifetime) -> TokenStream {
    let Some(field_ident) = field.ident.as_ref() else {
        return quote! {};
    };
    let Some(field_name) = field.field_name.as_ref() else {
        return quote! {};
    };
    let field_ty = extract_inner_type(&field.ty);
    let (kind, optional) = classify(field_ty);

    // Strip leading underscore from field name for accessor names
    let field_name_str = field_ident.to_string();
    let clean_name = field_name_str.strip_prefix('_').unwrap_or(&field_name_str);
    let getter_name = format_ident!("{}", clean_name);
    let setter_name = format_ident!("set_{}", clean_name);
    let reset_name = format_ident!("reset_{}", clean_name);
    let const_field_name = format_ident!("{}_FIELD", clean_name.to_uppercase());

    let getter_doc = format!("Get `{}`", field_name);
    let setter_doc = format!("Set `{}`; `false` if the value is rejected", field_name);
    let reset_doc = format!("Blank `{}`, reverting it to the schema default", field_name);

    let index = quote! { self.idd_field_index(Self::#const_field_name) };

    let (getter, setter) = match kind {
        ValueKind::Reference(target) => {
            let getter = quote! {
                #[doc = #getter_doc]
                pub fn #getter_name(&self) -> ::std::option::Option<#target> {
                    self.ws
                        .resolve_reference(self.handle, #index)
                        .and_then(|h| <#target as ::bemkit_core::ModelObject<#lifetime>>::from_handle(self.ws, h))
                }
            };
            let setter = quote! {
                #[doc = #setter_doc]
                pub fn #setter_name(&self, target: &#target) -> bool {
                    let target = <#target as ::bemkit_core::ModelObject<#lifetime>>::handle(target);
                    self.ws.set_reference(self.handle, #index, target)
                }
            };
            (getter, setter)
        }
        kind => {
            let (value_ty, read, write, arg_ty) = match kind {
                ValueKind::Double => (quote! { f64 }, quote! { get_double }, quote! { set_double }, quote! { f64 }),
                ValueKind::Int => (quote! { i32 }, quote! { get_int }, quote! { set_int }, quote! { i32 }),
                ValueKind::Bool => (quote! { bool }, quote! { get_bool }, quote! { set_bool }, quote! { bool }),
                _ => (quote! { ::std::string::String }, quote! { get_string }, quote! { set_string }, quote! { &str }),
            };

            let getter = if optional {
                quote! {
                    #[doc = #getter_doc]
                    pub fn #getter_name(&self) -> ::std::option::Option<#value_ty> {
                        self.ws.#read(self.handle, #index)
                    }
                }
            } else {
                quote! {
                    #[doc = #getter_doc]
                    ///
                    /// Reads the type's default value, with a warning, when the
                    /// field is blank without a schema default.
                    pub fn #getter_name(&self) -> #value_ty {
                        ::bemkit_core::facade::required_value(
                            self.ws.#read(self.handle, #index),
                            self.handle,
                            #field_name,
                        )
                    }
                }
            };
            let setter = quote! {
                #[doc = #setter_doc]
                pub fn #setter_name(&self, value: #arg_ty) -> bool {
                    self.ws.#write(self.handle, #index, value)
                }
            };
            (getter, setter)
        }
    };

    // Readonly fields get neither setter nor reset
    let mutators = if field.readonly {
        quote! {}
    } else {
        quote! {
            #setter

            #[doc = #reset_doc]
            pub fn #reset_name(&self) {
                self.ws.reset_field(self.handle, #index)
            }
        }
    };

    let defaulted = if field.default {
        let name = format_ident!("is_{}_defaulted", clean_name);
        quote! {
            pub fn #name(&self) -> bool {
                self.ws.is_defaulted(self.handle, #index)
            }
        }
    } else {
        quote! {}
    };

    let autosize = if field.autosize {
        let query = format_ident!("is_{}_autosized", clean_name);
        let set = format_ident!("autosize_{}", clean_name);
        quote! {
            pub fn #query(&self) -> bool {
                self.ws.is_autosized(self.handle, #index)
            }

            pub fn #set(&self) -> bool {
                self.ws.set_string(self.handle, #index, ::bemkit_core::idd::AUTOSIZE)
            }
        }
    } else {
        quote! {}
    };

    let autocalculate = if field.autocalculate {
        let query = format_ident!("is_{}_autocalculated", clean_name);
        let set = format_ident!("autocalculate_{}", clean_name);
        quote! {
            pub fn #query(&self) -> bool {
                self.ws.is_autocalculated(self.handle, #index)
            }

            pub fn #set(&self) -> bool {
                self.ws.set_string(self.handle, #index, ::bemkit_core::idd::AUTOCALCULATE)
            }
        }
    } else {
        quote! {}
    };

    quote! {
        #getter
        #mutators
        #defaulted
        #autosize
        #autocalculate
    }
}

fn generate_constants(object_type: &str, fields: &[IddFieldArgs]) -> TokenStream {
    let field_constants = fields.iter().filter(|f| f.is_idd_field()).filter_map(|f| {
        let field_ident = f.ident.as_ref()?;
        let field_name = f.field_name.as_ref()?;

        // Strip leading underscore from field name for constant names
        let field_name_str = field_ident.to_string();
        let clean_name = field_name_str.strip_prefix('_').unwrap_or(&field_name_str);

        let const_name = format_ident!("{}_FIELD", clean_name.to_uppercase());
        let field_doc = format!("Schema field name for `{}`", clean_name);

        Some(quote! {
            #[doc = #field_doc]
            pub const #const_name: &'static str = #field_name;
        })
    });

    quote! {
        /// Schema type name
        pub const IDD_OBJECT_TYPE: &'static str = #object_type;

        #(#field_constants)*

        /// Schema type name of this façade
        pub fn idd_object_type() -> &'static str {
            Self::IDD_OBJECT_TYPE
        }
    }
}

fn generate_constructors(lifetime: &Lifetime) -> TokenStream {
    quote! {
        /// Add a blank record of this type (the existing one, for unique types)
        pub fn insert(ws: &#lifetime ::bemkit_core::Workspace) -> ::std::result::Result<Self, ::bemkit_core::WorkspaceError> {
            Self::get_or_insert(ws).map(|(object, _)| object)
        }

        /// Like `insert`, also reporting whether a record was created
        pub fn get_or_insert(
            ws: &#lifetime ::bemkit_core::Workspace,
        ) -> ::std::result::Result<(Self, bool), ::bemkit_core::WorkspaceError> {
            let (handle, created) = ws.get_or_add_object(Self::IDD_OBJECT_TYPE)?;
            let object = <Self as ::bemkit_core::ModelObject<#lifetime>>::from_handle(ws, handle)
                .expect("Workspace returned a record of another type");
            Ok((object, created))
        }

        /// Every record of this type, in creation order
        pub fn all(ws: &#lifetime ::bemkit_core::Workspace) -> ::std::vec::Vec<Self> {
            ws.get_objects_by_type(Self::IDD_OBJECT_TYPE)
                .into_iter()
                .filter_map(|h| <Self as ::bemkit_core::ModelObject<#lifetime>>::from_handle(ws, h))
                .collect()
        }

        /// Find a record of this type by name (case-insensitive)
        pub fn by_name(ws: &#lifetime ::bemkit_core::Workspace, name: &str) -> ::std::option::Option<Self> {
            ws.get_object_by_type_and_name(Self::IDD_OBJECT_TYPE, name)
                .and_then(|h| <Self as ::bemkit_core::ModelObject<#lifetime>>::from_handle(ws, h))
        }
    }
}

fn generate_model_object_impl(args: &IddObjectArgs, fields: &[IddFieldArgs], lifetime: &Lifetime) -> TokenStream {
    let struct_name = &args.ident;
    let (impl_generics, ty_generics, where_clause) = args.generics.split_for_impl();

    // Generate field initializers for from_handle
    let field_inits: Vec<_> = fields
        .iter()
        .filter(|f| !f.is_named("ws") && !f.is_named("handle"))
        .filter_map(|f| {
            let ident = f.ident.as_ref()?;
            if is_phantom_data(&f.ty) {
                Some(quote! { #ident: ::std::marker::PhantomData })
            } else {
                Some(quote! { #ident: ::std::default::Default::default() })
            }
        })
        .collect();

    quote! {
        impl #impl_generics ::bemkit_core::ModelObject<#lifetime> for #struct_name #ty_generics #where_clause {
            fn from_handle(
                ws: &#lifetime ::bemkit_core::Workspace,
                handle: ::bemkit_core::Handle,
            ) -> ::std::option::Option<Self> {
                let object_type = ws.object_type(handle)?;
                if !object_type.eq_ignore_ascii_case(Self::IDD_OBJECT_TYPE) {
                    return None;
                }
                Some(Self {
                    ws,
                    handle,
                    #(#field_inits),*
                })
            }

            fn workspace(&self) -> &#lifetime ::bemkit_core::Workspace {
                self.ws
            }

            fn handle(&self) -> ::bemkit_core::Handle {
                self.handle
            }
        }
    }
}
