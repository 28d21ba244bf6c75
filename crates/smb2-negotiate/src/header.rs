//! The SMB2 sync header, as it precedes NEGOTIATE messages.

use binrw::prelude::*;
use modular_bitfield::prelude::*;
use smb2_negotiate_derive::smb_request_response;

use crate::wire::wire_enum;

wire_enum! {
    /// SMB2 command codes understood by this crate.
    ///
    /// Reference: MS-SMB2 2.2.1.2
    pub enum Command: Command {
        Negotiate = 0x0000,
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message_as_string = match self {
            Command::Negotiate => "Negotiate",
        };
        write!(f, "{} ({:#x})", message_as_string, *self as u16)
    }
}

/// SMB2 Packet Header, sync form.
///
/// NEGOTIATE is never sent asynchronously, so the reserved & tree id
/// variant of the header is the only one supported.
///
/// Reference: MS-SMB2 2.2.1.2
#[smb_request_response(size = 64)]
#[brw(magic(b"\xfeSMB"), little)]
pub struct Header {
    /// Number of credits charged for this request.
    pub credit_charge: u16,
    /// NT status code.
    pub status: u32,
    pub command: Command,
    /// Number of credits requested or granted.
    pub credit_request: u16,
    pub flags: HeaderFlags,
    /// Offset to next message in a compounded chain (0 if not compounded).
    pub next_command: u32,
    pub message_id: u64,
    reserved: u32,
    pub tree_id: u32,
    pub session_id: u64,
    /// Message signature for signed messages.
    pub signature: u128,
}

impl Header {
    pub const STRUCT_SIZE: usize = 64;

    /// A header for a NEGOTIATE request, requesting a single credit.
    pub fn negotiate_request(message_id: u64) -> Self {
        Header {
            credit_charge: 0,
            status: 0,
            command: Command::Negotiate,
            credit_request: 1,
            flags: HeaderFlags::new(),
            next_command: 0,
            message_id,
            tree_id: 0,
            session_id: 0,
            signature: 0,
        }
    }

    /// A header for a successful NEGOTIATE response, granting a single credit.
    pub fn negotiate_response(message_id: u64) -> Self {
        Header {
            flags: HeaderFlags::new().with_server_to_redir(true),
            ..Self::negotiate_request(message_id)
        }
    }
}

/// SMB2 header flags.
///
/// Reference: MS-SMB2 2.2.1.2
#[smb2_dtyp::mbitfield]
pub struct HeaderFlags {
    /// Message is a server response (set in responses).
    pub server_to_redir: bool,
    /// Message is part of an asynchronous operation.
    pub async_command: bool,
    /// Request is a related operation in a compounded chain.
    pub related_operations: bool,
    /// Message is signed.
    pub signed: bool,
    /// Priority mask for quality of service.
    pub priority_mask: B3,
    #[skip]
    __: B21,
    /// Request is a DFS operation.
    pub dfs_operation: bool,
    /// Request is a replay operation for resilient handles.
    pub replay_operation: bool,
    #[skip]
    __: B2,
}

#[cfg(test)]
mod tests {
    use binrw::io::Cursor;
    use smb2_tests::*;

    use super::*;
    use crate::{SmbMsgError, ValueKind};

    test_binrw! {
        Header => negotiate_response: Header {
            credit_charge: 0,
            status: 0,
            command: Command::Negotiate,
            credit_request: 1,
            flags: HeaderFlags::new().with_server_to_redir(true),
            next_command: 0,
            message_id: 0,
            tree_id: 0,
            session_id: 0,
            signature: 0,
        } => "fe534d4240000000000000000000010001000000000000000000000000000000
              0000000000000000000000000000000000000000000000000000000000000000"
    }

    #[test]
    fn test_header_rejects_other_commands() {
        let bytes = hex_to_bytes(
            "fe534d4240000000000000000500010000000000000000000000000000000000
             0000000000000000000000000000000000000000000000000000000000000000",
        );
        let err: SmbMsgError = Header::read(&mut Cursor::new(bytes)).unwrap_err().into();
        assert!(matches!(
            err,
            SmbMsgError::UnsupportedValue {
                kind: ValueKind::Command,
                value: 5
            }
        ));
    }

    #[test]
    fn test_negotiate_headers() {
        assert!(!Header::negotiate_request(0).flags.server_to_redir());
        assert!(Header::negotiate_response(0).flags.server_to_redir());
        assert_eq!(Header::negotiate_response(3).message_id, 3);
    }
}
