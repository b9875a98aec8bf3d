//! `#[derive(Error)]`.
//!
//! ```ignore
//! use chainvm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum DecodeError {
//!     #[error("unexpected end of input")]
//!     UnexpectedEof,
//!     #[error("length {len} exceeds {max}")]
//!     TooLong { len: usize, max: usize },
//!     #[error("unknown tag {0:#04x}")]
//!     UnknownTag(u8),
//! }
//! ```
//!
//! Tuple fields are referenced positionally (`{0}`), named fields by name.
//! Fields the message does not mention are ignored.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let message = message(&variant.attrs, &variant.ident)?;
                    let ident = &variant.ident;
                    Ok(write_arm(quote! { Self::#ident }, &variant.fields, &message))
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #( #arms )*
                }
            }
        }
        Data::Struct(data) => {
            let message = message(&input.attrs, &input.ident)?;
            let arm = write_arm(quote! { Self }, &data.fields, &message);
            quote! {
                match self {
                    #arm
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// True when `message` interpolates `arg`, with or without a format spec.
fn mentions(message: &str, arg: &str) -> bool {
    message.contains(&format!("{{{arg}}}")) || message.contains(&format!("{{{arg}:"))
}

fn write_arm(path: TokenStream2, fields: &Fields, message: &str) -> TokenStream2 {
    match fields {
        Fields::Unit => quote! { #path => write!(f, #message), },
        Fields::Named(named) => {
            let used: Vec<_> = named
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|ident| mentions(message, &ident.to_string()))
                .collect();
            quote! {
                #path { #( #used, )* .. } => write!(f, #message #(, #used = #used)*),
            }
        }
        Fields::Unnamed(unnamed) => {
            let mut message = message.to_string();
            let mut patterns = Vec::with_capacity(unnamed.unnamed.len());
            let mut used = Vec::new();
            for i in 0..unnamed.unnamed.len() {
                let position = i.to_string();
                if mentions(&message, &position) {
                    let ident = format_ident!("f{}", i);
                    message = message
                        .replace(&format!("{{{i}}}"), &format!("{{{ident}}}"))
                        .replace(&format!("{{{i}:"), &format!("{{{ident}:"));
                    patterns.push(ident.to_token_stream());
                    used.push(ident);
                } else {
                    patterns.push(quote! { _ });
                }
            }
            quote! {
                #path( #( #patterns ),* ) => write!(f, #message #(, #used = #used)*),
            }
        }
    }
}

/// Reads the string literal out of `#[error("...")]`.
fn message<T: ToTokens>(attrs: &[Attribute], target: &T) -> syn::Result<String> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new_spanned(target, "missing #[error(\"...\")] display message")
        })?;

    let Meta::List(list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "expected #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(list.tokens.clone()) {
        Ok(Lit::Str(lit)) => Ok(lit.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] takes a single string literal",
        )),
    }
}
