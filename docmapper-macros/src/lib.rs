//! Procedural macros for the docmapper project.
//!
//! This crate provides `#[derive(Record)]`, which generates the static field table a repository
//! builds its field map from.
//!
//! # Attributes
//!
//! Field attributes under `#[record(...)]`:
//!
//! - `id` - the field is the document identifier (must be a `String`)
//! - `version` - the field receives the engine's document version
//! - `omit_empty` - the field is left out of written documents when empty or null
//!
//! Wire keys follow serde: `#[serde(rename = "...")]` on a field and
//! `#[serde(rename_all = "...")]` on the struct are honored, and `#[serde(skip)]` fields are not
//! mapped at all.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::Record;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Record)]
//! pub struct User {
//!     #[record(id)]
//!     pub id: String,
//!     pub username: String,
//!     #[record(omit_empty)]
//!     pub email: Option<String>,
//!     #[serde(rename = "dateOfBirth")]
//!     pub date_of_birth: Option<String>,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, LitStr, Type, ext::IdentExt, parse_macro_input,
    spanned::Spanned,
};

/// Derives `docmapper::record::Record` for a struct with named fields.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_record(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_record(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(input.span(), "Record can only be derived for structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new(
            data.fields.span(),
            "Record requires a struct with named fields",
        ));
    };

    let rename_all = container_rename_all(&input.attrs)?;
    let mut descriptors = Vec::with_capacity(fields.named.len());

    for field in &fields.named {
        let Some(ident) = &field.ident else {
            continue;
        };

        let serde = SerdeField::parse(&field.attrs)?;
        if serde.skip {
            continue;
        }

        let flags = RecordFlags::parse(&field.attrs)?;
        let name = ident.unraw().to_string();
        let key = match (serde.rename, rename_all) {
            (Some(rename), _) => Some(rename),
            (None, Some(rule)) => Some(rule.apply(&name)).filter(|key| *key != name),
            (None, None) => None,
        };

        descriptors.push(descriptor_tokens(&name, key.as_deref(), field_kind(&field.ty), &flags));
    }

    let ident = &input.ident;
    let type_name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docmapper::record::Record for #ident #ty_generics #where_clause {
            fn fields() -> &'static [::docmapper::record::FieldDescriptor] {
                const FIELDS: &[::docmapper::record::FieldDescriptor] = &[
                    #(#descriptors),*
                ];
                FIELDS
            }

            fn type_name() -> &'static str {
                #type_name
            }
        }
    })
}

fn descriptor_tokens(name: &str, key: Option<&str>, kind: Kind, flags: &RecordFlags) -> TokenStream2 {
    let kind = kind.tokens();
    let mut tokens = quote! {
        ::docmapper::record::FieldDescriptor::new(#name, #kind)
    };

    if let Some(key) = key {
        tokens = quote! { #tokens.key(#key) };
    }
    if flags.id {
        tokens = quote! { #tokens.identifier() };
    }
    if flags.version {
        tokens = quote! { #tokens.version() };
    }
    if flags.omit_empty {
        tokens = quote! { #tokens.omit_empty() };
    }

    tokens
}

#[derive(Debug, Default)]
struct RecordFlags {
    id: bool,
    version: bool,
    omit_empty: bool,
}

impl RecordFlags {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut flags = Self::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("record")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    flags.id = true;
                } else if meta.path.is_ident("version") {
                    flags.version = true;
                } else if meta.path.is_ident("omit_empty") {
                    flags.omit_empty = true;
                } else {
                    return Err(meta.error("expected `id`, `version` or `omit_empty`"));
                }
                Ok(())
            })?;
        }

        Ok(flags)
    }
}

#[derive(Debug, Default)]
struct SerdeField {
    rename: Option<String>,
    skip: bool,
}

impl SerdeField {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut field = Self::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    field.rename = Some(value.value());
                    return Ok(());
                }
                if meta.path.is_ident("skip") {
                    field.skip = true;
                }

                skip_meta_value(&meta)
            })?;
        }

        Ok(field)
    }
}

fn container_rename_all(attrs: &[Attribute]) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rule = Some(
                    RenameRule::from_str(&value.value())
                        .ok_or_else(|| syn::Error::new(value.span(), "unknown rename_all rule"))?,
                );
                return Ok(());
            }

            skip_meta_value(&meta)
        })?;
    }

    Ok(rule)
}

/// Consumes the value of a serde option this crate does not read.
fn skip_meta_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream2 = content.parse()?;
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_str(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    /// Applies the rule to a snake_case field name.
    fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
            Self::Pascal => pascal_case(field),
            Self::Camel => {
                let pascal = pascal_case(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
        }
    }
}

fn pascal_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut capitalize = true;

    for ch in field.chars() {
        if ch == '_' {
            capitalize = true;
        } else if capitalize {
            out.push(ch.to_ascii_uppercase());
            capitalize = false;
        } else {
            out.push(ch);
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Number,
    Bool,
    Optional,
    Other,
}

impl Kind {
    fn tokens(self) -> TokenStream2 {
        match self {
            Kind::String => quote!(::docmapper::record::FieldKind::String),
            Kind::Number => quote!(::docmapper::record::FieldKind::Number),
            Kind::Bool => quote!(::docmapper::record::FieldKind::Bool),
            Kind::Optional => quote!(::docmapper::record::FieldKind::Optional),
            Kind::Other => quote!(::docmapper::record::FieldKind::Other),
        }
    }
}

/// Classifies a field type by the last segment of its path.
fn field_kind(ty: &Type) -> Kind {
    let Type::Path(path) = ty else {
        return Kind::Other;
    };
    let Some(segment) = path.path.segments.last() else {
        return Kind::Other;
    };

    match segment.ident.to_string().as_str() {
        "String" => Kind::String,
        "Option" => Kind::Optional,
        "bool" => Kind::Bool,
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128"
        | "usize" | "f32" | "f64" => Kind::Number,
        _ => Kind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_rules_follow_serde() {
        assert_eq!(RenameRule::Camel.apply("date_of_birth"), "dateOfBirth");
        assert_eq!(RenameRule::Pascal.apply("date_of_birth"), "DateOfBirth");
        assert_eq!(RenameRule::ScreamingKebab.apply("date_of_birth"), "DATE-OF-BIRTH");
        assert_eq!(RenameRule::Camel.apply("id"), "id");
        assert_eq!(RenameRule::from_str("camelCase"), Some(RenameRule::Camel));
        assert_eq!(RenameRule::from_str("Title Case"), None);
    }

    #[test]
    fn field_kind_reads_last_path_segment() {
        let kind = |source: &str| field_kind(&syn::parse_str::<Type>(source).unwrap());

        assert_eq!(kind("String"), Kind::String);
        assert_eq!(kind("std::string::String"), Kind::String);
        assert_eq!(kind("Option<String>"), Kind::Optional);
        assert_eq!(kind("u64"), Kind::Number);
        assert_eq!(kind("bool"), Kind::Bool);
        assert_eq!(kind("Vec<String>"), Kind::Other);
        assert_eq!(kind("&'static str"), Kind::Other);
    }

    #[test]
    fn expansion_maps_serde_attributes() {
        let input: DeriveInput = syn::parse_quote! {
            #[serde(rename_all = "camelCase")]
            struct User {
                #[record(id)]
                id: String,
                #[serde(rename = "mail")]
                #[record(omit_empty)]
                email: Option<String>,
                date_of_birth: Option<String>,
                #[serde(skip)]
                cache: Vec<u8>,
            }
        };

        let expanded = expand_record(&input).unwrap().to_string();

        assert!(expanded.contains("\"mail\""));
        assert!(expanded.contains("\"dateOfBirth\""));
        assert!(!expanded.contains("\"cache\""));
        assert!(expanded.contains("identifier"));
        assert!(expanded.contains("omit_empty"));
    }

    #[test]
    fn expansion_rejects_enums() {
        let input: DeriveInput = syn::parse_quote! {
            enum Status { Active }
        };

        assert!(expand_record(&input).is_err());
    }
}
