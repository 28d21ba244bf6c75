//! Utility macros shared by the smb2-* crates.
//!
//! Re-exported by `smb2-dtyp`; use it from there.

use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Turns a struct into a `modular_bitfield` bit-field that reads and writes
/// itself as raw little-endian bytes through binrw.
///
/// Valid usage is `#[mbitfield]` before a struct definition whose fields
/// add up to a whole number of bytes. The using crate must depend on
/// `modular-bitfield` and `binrw`.
#[proc_macro_attribute]
pub fn mbitfield(_attr: TokenStream, input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);

    TokenStream::from(quote! {
        #[::modular_bitfield::bitfield]
        #[derive(::binrw::BinRead, ::binrw::BinWrite, Debug, Default, Clone, Copy, PartialEq, Eq)]
        #[bw(map = |&x| Self::into_bytes(x))]
        #[br(map = Self::from_bytes)]
        #item
    })
}
