#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod header;
pub mod negotiate;
pub mod negotiated;
pub mod preauth_hash;

mod wire;


#[cfg(test)]
use test::*;

pub use codec::*;
pub use config::{EncryptionMode, NegotiateConfig};
pub use crypto::*;
pub use error::{DecodeFailure, SmbMsgError, ValueKind};
pub use header::{Command, Header, HeaderFlags};
pub use negotiate::*;
pub use negotiated::NegotiatedProperties;
pub use preauth_hash::{PreauthHashState, PreauthHashValue};

pub use smb2_dtyp::{Guid, binrw_util::prelude::FileTime};

/// SMB NEGOTIATE Result type
pub type Result<T> = std::result::Result<T, SmbMsgError>;
