//! SMB2 NEGOTIATE messages and their building blocks.
//!
//! Reference: MS-SMB2 2.2.3, 2.2.4

use modular_bitfield::prelude::*;

use crate::{SmbMsgError, wire::wire_enum};

mod context;
mod request;
mod response;

pub use context::*;
pub use request::*;
pub use response::*;

wire_enum! {
    /// SMB2/SMB3 protocol dialect revisions.
    ///
    /// Reference: MS-SMB2 2.2.3
    pub enum Dialect: Dialect {
        Smb0202 = 0x0202,
        Smb021 = 0x0210,
        Smb030 = 0x0300,
        Smb0302 = 0x0302,
        Smb0311 = 0x0311,
    }
}

impl Dialect {
    pub const MAX: Dialect = Dialect::Smb0311;
    pub const MIN: Dialect = Dialect::Smb0202;

    /// Whether this is an SMB3 dialect.
    #[inline]
    pub fn is_smb3(&self) -> bool {
        self >= &Dialect::Smb030
    }
}

wire_enum! {
    /// Dialects that may be used in the SMB Negotiate Response.
    ///
    /// The same as [Dialect] but includes a wildcard revision for SMB 2.0,
    /// which a server returns when it wants the client to start over with
    /// an SMB2 NEGOTIATE.
    ///
    /// Reference: MS-SMB2 2.2.4
    pub enum NegotiateDialect: Dialect {
        Smb0202 = 0x0202,
        Smb021 = 0x0210,
        Smb02Wildcard = 0x02FF,
        Smb030 = 0x0300,
        Smb0302 = 0x0302,
        Smb0311 = 0x0311,
    }
}

impl From<Dialect> for NegotiateDialect {
    fn from(value: Dialect) -> Self {
        match value {
            Dialect::Smb0202 => NegotiateDialect::Smb0202,
            Dialect::Smb021 => NegotiateDialect::Smb021,
            Dialect::Smb030 => NegotiateDialect::Smb030,
            Dialect::Smb0302 => NegotiateDialect::Smb0302,
            Dialect::Smb0311 => NegotiateDialect::Smb0311,
        }
    }
}

impl TryFrom<NegotiateDialect> for Dialect {
    type Error = SmbMsgError;

    fn try_from(value: NegotiateDialect) -> Result<Self, Self::Error> {
        match value {
            NegotiateDialect::Smb0202 => Ok(Dialect::Smb0202),
            NegotiateDialect::Smb021 => Ok(Dialect::Smb021),
            NegotiateDialect::Smb030 => Ok(Dialect::Smb030),
            NegotiateDialect::Smb0302 => Ok(Dialect::Smb0302),
            NegotiateDialect::Smb0311 => Ok(Dialect::Smb0311),
            NegotiateDialect::Smb02Wildcard => Err(Self::Error::InvalidDialect(value)),
        }
    }
}

/// Flags for SMB2 negotiation security mode.
///
/// Reference: MS-SMB2 2.2.3
#[smb2_dtyp::mbitfield]
pub struct NegotiateSecurityMode {
    /// Signing is enabled.
    pub signing_enabled: bool,
    /// Signing is required.
    pub signing_required: bool,
    #[skip]
    __: B14,
}

/// Global capabilities flags for SMB2/SMB3.
///
/// Indicates various protocol capabilities supported by the client or server.
///
/// Reference: MS-SMB2 2.2.3
#[smb2_dtyp::mbitfield]
pub struct GlobalCapabilities {
    /// DFS support.
    pub dfs: bool,
    /// File leasing support.
    pub leasing: bool,
    /// Large MTU support (multiple credit operations).
    pub large_mtu: bool,
    /// Multi-channel support.
    pub multi_channel: bool,

    /// Persistent handles support.
    pub persistent_handles: bool,
    /// Directory leasing support.
    pub directory_leasing: bool,
    /// Encryption support.
    pub encryption: bool,
    /// Change notifications support.
    pub notifications: bool,

    #[skip]
    __: B24,
}
