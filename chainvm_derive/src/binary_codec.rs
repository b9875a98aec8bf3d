//! `#[derive(BinaryCodec)]`.
//!
//! Structs encode their fields back to back in declaration order. Enums write
//! a one-byte tag first: the explicit discriminant when one is given
//! (`Claim = 0x02`), otherwise the previous tag plus one. Decoding an unknown
//! tag yields `DecodeError::InvalidValue`.
//!
//! Length-prefixed field types (`Vec<T>`, `Bytes`, `String`) carry a
//! variable-length integer prefix, so derived layouts match the node's wire
//! format byte for byte.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DataEnum, DeriveInput, Fields, parse_macro_input};

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (encode_body, decode_body) = match &input.data {
        Data::Struct(data) => struct_bodies(&data.fields),
        Data::Enum(data) => enum_bodies(data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "BinaryCodec cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_body
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                #decode_body
            }
        }
    })
}

/// Binding names used when destructuring fields in a match arm.
fn bindings(fields: &Fields) -> Vec<syn::Ident> {
    match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|f| f.ident.clone())
            .collect(),
        Fields::Unnamed(unnamed) => (0..unnamed.unnamed.len())
            .map(|i| format_ident!("f{}", i))
            .collect(),
        Fields::Unit => Vec::new(),
    }
}

/// Builds `Self { a: decode?, .. }`, `Self(decode?, ..)` or `Self` for a
/// constructor path.
fn constructor(path: TokenStream2, fields: &Fields) -> TokenStream2 {
    let decode = quote! { crate::types::encoding::Decode::decode(input)? };
    match fields {
        Fields::Named(named) => {
            let names = named.named.iter().map(|f| &f.ident);
            quote! { #path { #( #names: #decode, )* } }
        }
        Fields::Unnamed(unnamed) => {
            let decodes = unnamed.unnamed.iter().map(|_| &decode);
            quote! { #path( #( #decodes, )* ) }
        }
        Fields::Unit => path,
    }
}

fn destructure(path: TokenStream2, fields: &Fields, names: &[syn::Ident]) -> TokenStream2 {
    match fields {
        Fields::Named(_) => quote! { #path { #( #names ),* } },
        Fields::Unnamed(_) => quote! { #path( #( #names ),* ) },
        Fields::Unit => path,
    }
}

fn struct_bodies(fields: &Fields) -> (TokenStream2, TokenStream2) {
    let names = bindings(fields);
    let pattern = destructure(quote! { Self }, fields, &names);
    let encode = quote! {
        #[allow(unused_variables)]
        let #pattern = self;
        #( crate::types::encoding::Encode::encode(#names, out); )*
    };
    let build = constructor(quote! { Self }, fields);
    let decode = if names.is_empty() {
        quote! {
            let _ = input;
            Ok(#build)
        }
    } else {
        quote! { Ok(#build) }
    };
    (encode, decode)
}

fn enum_bodies(data: &DataEnum) -> syn::Result<(TokenStream2, TokenStream2)> {
    let tags = tags(data)?;
    let mut encode_arms = Vec::with_capacity(data.variants.len());
    let mut decode_arms = Vec::with_capacity(data.variants.len());

    for (variant, tag) in data.variants.iter().zip(tags) {
        let ident = &variant.ident;
        let names = bindings(&variant.fields);
        let pattern = destructure(quote! { Self::#ident }, &variant.fields, &names);
        encode_arms.push(quote! {
            #pattern => {
                crate::types::encoding::Encode::encode(&#tag, out);
                #( crate::types::encoding::Encode::encode(#names, out); )*
            }
        });
        let build = constructor(quote! { Self::#ident }, &variant.fields);
        decode_arms.push(quote! { #tag => Ok(#build), });
    }

    let encode = quote! {
        match self {
            #( #encode_arms )*
        }
    };
    let decode = quote! {
        let tag: u8 = crate::types::encoding::Decode::decode(input)?;
        match tag {
            #( #decode_arms )*
            _ => Err(crate::types::encoding::DecodeError::InvalidValue),
        }
    };
    Ok((encode, decode))
}

/// Resolves the wire tag of every variant, following Rust's implicit
/// discriminant numbering.
fn tags(data: &DataEnum) -> syn::Result<Vec<u8>> {
    let mut tags = Vec::with_capacity(data.variants.len());
    let mut next: Option<u8> = Some(0);

    for variant in &data.variants {
        let tag = match &variant.discriminant {
            Some((_, expr)) => literal_tag(expr)?,
            None => next.ok_or_else(|| {
                syn::Error::new_spanned(variant, "enum tag does not fit in a u8")
            })?,
        };
        tags.push(tag);
        next = tag.checked_add(1);
    }

    Ok(tags)
}

fn literal_tag(expr: &syn::Expr) -> syn::Result<u8> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(lit),
            ..
        }) => lit.base10_parse::<u8>(),
        _ => Err(syn::Error::new_spanned(
            expr,
            "BinaryCodec discriminants must be integer literals",
        )),
    }
}
