//! Common data types for the smb2-* crates.
//!
//! See [`guid::Guid`] and [`binrw_util::prelude::FileTime`].

#![forbid(unsafe_code)]

pub mod binrw_util;
pub mod guid;

pub use guid::{Guid, GuidParseError};
pub use smb2_dtyp_derive::mbitfield;
