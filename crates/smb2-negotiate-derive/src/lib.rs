//! Attribute macros for building SMB2 NEGOTIATE message structs.
//!
//! This should be used only within the `smb2-negotiate` crate.
//! Macros shared with data types live in `smb2-dtyp-derive`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    DeriveInput, Expr, ExprLit, Fields, ItemStruct, Lit, Meta,
    parse::{Parse, ParseStream, Parser, Result},
    parse_macro_input,
};

/// Which side of the wire a message travels on.
///
/// The client writes requests and reads responses, the server does the opposite,
/// so each side only needs half of the binrw implementations.
enum Direction {
    Request,
    Both,
}

impl Direction {
    /// Returns the binrw attributes for the direction,
    /// selected by the `client`/`server` features of the using crate.
    fn binrw_attrs(&self) -> proc_macro2::TokenStream {
        match self {
            Direction::Request => quote! {
                #[cfg_attr(all(feature = "server", feature = "client"), ::binrw::binrw)]
                #[cfg_attr(all(feature = "server", not(feature = "client")), ::binrw::binread)]
                #[cfg_attr(all(not(feature = "server"), feature = "client"), ::binrw::binwrite)]
            },
            Direction::Both => quote! {
                #[::binrw::binrw]
            },
        }
    }
}

/// The `size = <u16>` argument.
struct StructureSize(u16);

impl Parse for StructureSize {
    fn parse(input: ParseStream) -> Result<Self> {
        match input.parse::<Meta>()? {
            Meta::NameValue(nv) if nv.path.is_ident("size") => match nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Int(lit), ..
                }) => Ok(StructureSize(lit.base10_parse()?)),
                other => Err(syn::Error::new_spanned(other, "expected integer literal")),
            },
            other => Err(syn::Error::new_spanned(other, "expected `size = <u16>`")),
        }
    }
}

/// Builds the leading `_structure_size` field: written as `size`, validated on read.
fn structure_size_field(size: u16) -> Result<syn::Field> {
    syn::Field::parse_named.parse2(quote! {
        #[bw(calc = #size)]
        #[br(temp)]
        #[br(assert(_structure_size == #size))]
        _structure_size: u16
    })
}

/// Adds the binrw & std derives, and turns every field named `reserved`
/// into a temporary, zero-written field with a unique name.
fn prepare_binrw_item(direction: Direction, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let is_struct = matches!(input.data, syn::Data::Struct(_));

    let binrw_attrs = direction.binrw_attrs();
    let prepared = TokenStream::from(quote! {
        #binrw_attrs
        #[derive(Debug, Clone, PartialEq, Eq)]
        #input
    });
    if !is_struct {
        return prepared;
    }

    let mut item = parse_macro_input!(prepared as ItemStruct);
    if let Fields::Named(ref mut fields) = item.fields {
        let reserved_fields = fields
            .named
            .iter_mut()
            .filter(|f| f.ident.as_ref().is_some_and(|id| *id == "reserved"));
        for (index, field) in reserved_fields.enumerate() {
            if field.vis != syn::Visibility::Inherited {
                return syn::Error::new_spanned(&field.vis, "reserved fields must be private")
                    .to_compile_error()
                    .into();
            }

            field.ident = Some(syn::Ident::new(
                &format!("_reserved{index}"),
                proc_macro2::Span::call_site(),
            ));
            field.attrs.push(syn::parse_quote! { #[br(temp)] });
            field.attrs.push(match &field.ty {
                syn::Type::Array(arr) => {
                    let len = &arr.len;
                    syn::parse_quote! { #[bw(calc = [0; #len])] }
                }
                _ => syn::parse_quote! { #[bw(calc = Default::default())] },
            });
        }
    }

    TokenStream::from(quote! { #item })
}

/// Shared implementation of the sized message macros.
fn sized_message(direction: Direction, attr: TokenStream, item: TokenStream) -> TokenStream {
    let StructureSize(size) = parse_macro_input!(attr as StructureSize);
    let item = prepare_binrw_item(direction, item);
    let mut item = parse_macro_input!(item as ItemStruct);

    let size_field = match structure_size_field(size) {
        Ok(field) => field,
        Err(e) => return e.to_compile_error().into(),
    };
    match item.fields {
        Fields::Named(ref mut fields) => fields.named.insert(0, size_field),
        _ => {
            return syn::Error::new_spanned(&item.fields, "expected named fields")
                .to_compile_error()
                .into();
        }
    }

    TokenStream::from(quote! { #item })
}

/// Declares an SMB2 request struct, prefixed by its validated `StructureSize`.
///
/// Valid usage is `#[smb_request(size = <u16>)]` before a struct definition.
#[proc_macro_attribute]
pub fn smb_request(attr: TokenStream, input: TokenStream) -> TokenStream {
    sized_message(Direction::Request, attr, input)
}

/// Declares a struct used in both directions, prefixed by its validated `StructureSize`.
///
/// Valid usage is `#[smb_request_response(size = <u16>)]` before a struct definition.
#[proc_macro_attribute]
pub fn smb_request_response(attr: TokenStream, input: TokenStream) -> TokenStream {
    sized_message(Direction::Both, attr, input)
}

/// Adds binrw read & write support and the common derives to a struct or enum
/// that is not a message by itself, such as a negotiate context payload.
#[proc_macro_attribute]
pub fn smb_message_binrw(_attr: TokenStream, input: TokenStream) -> TokenStream {
    prepare_binrw_item(Direction::Both, input)
}
