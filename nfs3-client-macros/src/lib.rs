//! Derive macros for the XDR `PackTo` / `UnpackFrom` traits of `nfs3-client`.
//!
//! Structs are encoded field by field, in declaration order.  Enums are
//! encoded as XDR discriminated unions: a 32-bit discriminant followed by
//! the single (optional) field of the selected arm.  The discriminant is
//! taken from an explicit `= value`, an `#[xdr(CONST)]` attribute, or the
//! previous discriminant plus one.
//!
//! The generated code refers to the traits through a path named `xdr`, so
//! the deriving module must have `xdr` in scope (`use crate::xdr;`).
use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use syn::spanned::Spanned;

#[macro_use]
extern crate quote;
extern crate syn;

#[proc_macro_derive(PackTo, attributes(xdr))]
pub fn derive_pack_to(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    let gen = impl_pack_to(&ast);
    gen.into()
}

#[proc_macro_derive(UnpackFrom, attributes(xdr))]
pub fn derive_unpack_from(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    let gen = impl_unpack_from(&ast);
    gen.into()
}

/// Transform the input into a token stream containing any generated implementations,
/// as well as all errors that occurred.
fn impl_pack_to(input: &syn::DeriveInput) -> TokenStream {
    let mut errors: Vec<syn::Error> = Vec::new();

    let mut output_tokens = match &input.data {
        syn::Data::Struct(ds) => impl_pack_to_struct(&input.ident, ds, &mut errors),
        syn::Data::Enum(de) => impl_pack_to_enum(&input.ident, de, &mut errors),
        syn::Data::Union(_) => {
            errors.push(syn::Error::new(
                input.span(),
                "`#[derive(PackTo)]` cannot be applied to unions",
            ));
            TokenStream::new()
        }
    };

    output_tokens.extend(errors.iter().map(|err| err.to_compile_error()));

    output_tokens
}

/// Returns the named fields of a struct, an empty list for unit structs and
/// `None` (after recording an error) for tuple structs.
fn named_fields<'a>(
    derive: &str,
    ds: &'a syn::DataStruct,
    errors: &mut Vec<syn::Error>,
) -> Option<Vec<&'a syn::Field>> {
    match &ds.fields {
        syn::Fields::Named(fields) => Some(fields.named.iter().collect()),
        syn::Fields::Unnamed(_) => {
            errors.push(syn::Error::new(
                ds.struct_token.span(),
                format!("`#[derive({})]` is not supported on tuple structs", derive),
            ));
            None
        }
        syn::Fields::Unit => Some(Vec::new()),
    }
}

fn impl_pack_to_struct(
    name: &syn::Ident,
    ds: &syn::DataStruct,
    errors: &mut Vec<syn::Error>,
) -> TokenStream {
    let fields = match named_fields("PackTo", ds, errors) {
        Some(fields) => fields,
        None => return TokenStream::new(),
    };

    let idents: Vec<_> = fields.iter().filter_map(|f| f.ident.as_ref()).collect();

    let span = Span::call_site();
    quote_spanned! { span =>
        #[automatically_derived]
        impl<B: xdr::Packer> xdr::PackTo<B> for #name {
            #[allow(unused_variables)]
            fn pack_to(&self, buf: &mut B) {
                #(
                    xdr::PackTo::<B>::pack_to(&self.#idents, buf);
                )*
            }
        }
    }
}

/// One arm of a discriminated union: its variant, discriminant expression and
/// the type of its single field (if any).
struct UnionArm<'a> {
    ident: &'a syn::Ident,
    discriminant: TokenStream,
    inner: Option<&'a syn::Type>,
    span: Span,
}

/// Walks the variants of an enum, computing each discriminant.  Variants that
/// cannot be encoded are reported through `errors` and skipped.
fn union_arms<'a>(
    derive: &str,
    de: &'a syn::DataEnum,
    errors: &mut Vec<syn::Error>,
) -> Vec<UnionArm<'a>> {
    let mut arms = Vec::new();
    let mut discriminant = quote!(0);
    let mut has_discriminants = false;

    for variant in de.variants.iter() {
        let n_from_attr = discriminant_from_attr(errors, &variant.attrs);
        let n_from_discriminant = match &variant.discriminant {
            None => None,
            Some((_, expr)) => {
                has_discriminants = true;
                Some(expr.to_token_stream())
            }
        };

        if n_from_attr.is_some() && has_discriminants {
            errors.push(syn::Error::new(
                de.enum_token.span(),
                format!(
                    "`#[derive({})]` cannot mix custom discriminant and attribute based discriminant",
                    derive
                ),
            ));

            continue;
        }

        discriminant = match n_from_attr.or(n_from_discriminant) {
            Some(n) => n,
            None => discriminant,
        };

        let inner = match &variant.fields {
            syn::Fields::Unit => None,
            syn::Fields::Unnamed(unnamed) => {
                if unnamed.unnamed.len() != 1 {
                    errors.push(syn::Error::new(
                        unnamed.paren_token.span,
                        format!(
                            "`#[derive({})]` enum variant cannot contain more than one field",
                            derive
                        ),
                    ));

                    continue;
                }
                unnamed.unnamed.first().map(|field| &field.ty)
            }
            syn::Fields::Named(named) => {
                errors.push(syn::Error::new(
                    named.brace_token.span,
                    format!(
                        "`#[derive({})]` is not supported on struct-like variants",
                        derive
                    ),
                ));

                continue;
            }
        };

        arms.push(UnionArm {
            ident: &variant.ident,
            discriminant: discriminant.clone(),
            inner,
            span: variant.span(),
        });

        discriminant = quote!((#discriminant) + 1);
    }

    if arms.is_empty() {
        errors.push(syn::Error::new(
            de.brace_token.span,
            format!("`#[derive({})]` cannot derive for empty enum", derive),
        ));
    }

    arms
}

fn impl_pack_to_enum(
    name: &syn::Ident,
    de: &syn::DataEnum,
    errors: &mut Vec<syn::Error>,
) -> TokenStream {
    let arms = union_arms("PackTo", de, errors);
    if arms.is_empty() {
        return TokenStream::new();
    }

    let arms: Vec<_> = arms
        .iter()
        .map(|arm| {
            let span = arm.span;
            let var_name = arm.ident;
            let discriminant = &arm.discriminant;
            match arm.inner {
                None => quote_spanned! { span => #name::#var_name => {
                    xdr::Packer::pack_uint(buf, (#discriminant) as u32);
                } },
                Some(_) => quote_spanned! { span => #name::#var_name(inner) => {
                    xdr::Packer::pack_uint(buf, (#discriminant) as u32);
                    xdr::PackTo::<B>::pack_to(inner, buf);
                } },
            }
        })
        .collect();

    let span = de.brace_token.span;
    quote_spanned! { span =>
        #[automatically_derived]
        impl<B: xdr::Packer> xdr::PackTo<B> for #name {
            fn pack_to(&self, buf: &mut B) {
                match self {
                    #( #arms )*
                }
            }
        }
    }
}

fn discriminant_from_attr(
    errors: &mut Vec<syn::Error>,
    attrs: &[syn::Attribute],
) -> Option<TokenStream> {
    for attr in attrs {
        let segments = &attr.path.segments;
        if segments.len() != 1 || segments[0].ident != "xdr" {
            continue;
        }
        return match attr.parse_args::<syn::Expr>() {
            Ok(expr) => Some(expr.to_token_stream()),
            Err(e) => {
                errors.push(e);
                None
            }
        };
    }

    None
}

/// Transform the input into a token stream containing any generated implementations,
/// as well as all errors that occurred.
fn impl_unpack_from(input: &syn::DeriveInput) -> TokenStream {
    let mut errors: Vec<syn::Error> = Vec::new();

    let mut output_tokens = match &input.data {
        syn::Data::Struct(ds) => impl_unpack_from_struct(&input.ident, ds, &mut errors),
        syn::Data::Enum(de) => impl_unpack_from_enum(&input.ident, de, &mut errors),
        syn::Data::Union(_) => {
            errors.push(syn::Error::new(
                input.span(),
                "`#[derive(UnpackFrom)]` cannot be applied to unions",
            ));
            TokenStream::new()
        }
    };

    output_tokens.extend(errors.iter().map(|err| err.to_compile_error()));

    output_tokens
}

fn impl_unpack_from_struct(
    name: &syn::Ident,
    ds: &syn::DataStruct,
    errors: &mut Vec<syn::Error>,
) -> TokenStream {
    let fields = match named_fields("UnpackFrom", ds, errors) {
        Some(fields) => fields,
        None => return TokenStream::new(),
    };

    let idents: Vec<_> = fields.iter().filter_map(|f| f.ident.as_ref()).collect();
    let types: Vec<_> = fields.iter().map(|f| f.ty.to_token_stream()).collect();

    let span = Span::call_site();
    quote_spanned! { span =>
        #[automatically_derived]
        impl<B: xdr::Unpacker> xdr::UnpackFrom<B> for #name {
            #[allow(unused_variables)]
            fn unpack_from(buf: &mut B) -> xdr::Result<Self> {
                Ok(#name {
                    #(
                        #idents : <#types as xdr::UnpackFrom<B>>::unpack_from(buf)?,
                    )*
                })
            }
        }
    }
}

fn impl_unpack_from_enum(
    name: &syn::Ident,
    de: &syn::DataEnum,
    errors: &mut Vec<syn::Error>,
) -> TokenStream {
    let arms = union_arms("UnpackFrom", de, errors);
    if arms.is_empty() {
        return TokenStream::new();
    }

    let mut consts = Vec::new();
    let mut match_arms = Vec::new();
    for (const_num, arm) in arms.iter().enumerate() {
        let span = arm.span;
        let var_name = arm.ident;
        let discriminant = &arm.discriminant;
        let const_name = format_ident!("_CONST{}", const_num);

        let unpack_inner = match arm.inner {
            None => TokenStream::new(),
            Some(inner_ty) => {
                quote_spanned!( span => ( <#inner_ty as xdr::UnpackFrom<B>>::unpack_from(buf)? ) )
            }
        };

        consts.push(quote_spanned! { span => const #const_name : u32 = (#discriminant) as u32; });
        match_arms.push(quote_spanned! { span => #const_name => Ok(#name::#var_name #unpack_inner), });
    }

    let type_name = name.to_string();
    let span = de.brace_token.span;
    quote_spanned! { span =>
        #[automatically_derived]
        impl<B: xdr::Unpacker> xdr::UnpackFrom<B> for #name {
            fn unpack_from(buf: &mut B) -> xdr::Result<Self> {
                #( #consts )*
                let n = xdr::Unpacker::unpack_uint(buf)?;
                match n {
                    #( #match_arms )*
                    _ => Err(xdr::XdrError::InvalidDiscriminant {
                        type_name: #type_name,
                        value: n,
                    }
                    .into()),
                }
            }
        }
    }
}
