//! The NEGOTIATE response.

use binrw::Endian;
use binrw::io::{Read, Seek, SeekFrom, Write};
use binrw::prelude::*;
use smb2_dtyp::{Guid, binrw_util::prelude::*};

use super::{
    CONTEXT_HEADER_SIZE, GlobalCapabilities, NegotiateContext, NegotiateDialect,
    NegotiateSecurityMode,
};
#[cfg(feature = "server")]
use crate::wire::{alignment_padding, narrow, write_zeros};
#[cfg(feature = "client")]
use crate::wire::{check_structure_size, ensure_remaining, read_counted};

/// The dialect chosen by the server, and what depends on it.
///
/// The negotiate context count & offset fields of the response only have
/// a meaning for 3.1.1; for other dialects they are reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseDialect {
    /// Any dialect but 3.1.1, including the SMB 2 wildcard.
    Legacy(NegotiateDialect),
    /// SMB 3.1.1, with the server's negotiate contexts.
    Smb0311(Vec<NegotiateContext>),
}

/// SMB2 NEGOTIATE Response.
///
/// Sent by the server to notify the client of the preferred common dialect.
///
/// Reference: MS-SMB2 2.2.4
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiateResponse {
    /// Server security mode.
    pub security_mode: NegotiateSecurityMode,
    /// Selected dialect revision, with its negotiate contexts.
    pub dialect: ResponseDialect,
    /// Server GUID.
    pub server_guid: Guid,
    /// Server capabilities.
    pub capabilities: GlobalCapabilities,
    /// Maximum transaction size supported by the server.
    pub max_transact_size: u32,
    /// Maximum read size supported by the server.
    pub max_read_size: u32,
    /// Maximum write size supported by the server.
    pub max_write_size: u32,
    /// Current system time on the server.
    pub system_time: FileTime,
    /// Server start time.
    pub server_start_time: FileTime,
    /// Security buffer containing GSSAPI token.
    pub buffer: Vec<u8>,
}

impl NegotiateResponse {
    pub const STRUCTURE_SIZE: u16 = 65;
    /// Size of the response before the security buffer.
    pub const FIXED_SIZE: u64 = 64;

    pub fn dialect_revision(&self) -> NegotiateDialect {
        match &self.dialect {
            ResponseDialect::Legacy(dialect) => *dialect,
            ResponseDialect::Smb0311(_) => NegotiateDialect::Smb0311,
        }
    }

    /// The negotiate contexts of the response; empty unless 3.1.1 was selected.
    pub fn negotiate_context_list(&self) -> &[NegotiateContext] {
        match &self.dialect {
            ResponseDialect::Legacy(_) => &[],
            ResponseDialect::Smb0311(contexts) => contexts,
        }
    }
}

/// Offsets, lengths & padding of a [`NegotiateResponse`],
/// all computed before the first byte is written.
#[cfg(feature = "server")]
#[derive(Debug, PartialEq, Eq)]
struct ResponseLayout {
    negotiate_context_count: u16,
    security_buffer_offset: u16,
    security_buffer_length: u16,
    negotiate_context_offset: u32,
    padding: u64,
}

#[cfg(feature = "server")]
impl ResponseLayout {
    fn new(start: u64, response: &NegotiateResponse) -> BinResult<Self> {
        let security_buffer_offset = start + NegotiateResponse::FIXED_SIZE;
        let buffer_end = security_buffer_offset + response.buffer.len() as u64;

        let (count, padding, negotiate_context_offset) = match &response.dialect {
            ResponseDialect::Legacy(NegotiateDialect::Smb0311) => {
                return Err(binrw::Error::AssertFail {
                    pos: start,
                    message: "a 3.1.1 response must be built as ResponseDialect::Smb0311".into(),
                });
            }
            ResponseDialect::Legacy(_) => (0, 0, 0),
            ResponseDialect::Smb0311(contexts) if contexts.is_empty() => (0, 0, 0),
            ResponseDialect::Smb0311(contexts) => {
                let padding = alignment_padding(buffer_end);
                (contexts.len() as u64, padding, buffer_end + padding)
            }
        };

        Ok(ResponseLayout {
            negotiate_context_count: narrow(count, start, "negotiate context count")?,
            security_buffer_offset: narrow(security_buffer_offset, start, "security buffer offset")?,
            security_buffer_length: narrow(
                response.buffer.len() as u64,
                start,
                "security buffer length",
            )?,
            negotiate_context_offset: narrow(
                negotiate_context_offset,
                start,
                "negotiate context offset",
            )?,
            padding,
        })
    }
}

#[cfg(feature = "server")]
impl BinWrite for NegotiateResponse {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        let start = writer.stream_position()?;
        let layout = ResponseLayout::new(start, self)?;
        log::trace!("Writing negotiate response with layout {layout:?}");

        Self::STRUCTURE_SIZE.write_options(writer, endian, ())?;
        self.security_mode.write_options(writer, endian, ())?;
        self.dialect_revision().write_options(writer, endian, ())?;
        layout.negotiate_context_count.write_options(writer, endian, ())?;
        self.server_guid.write_options(writer, endian, ())?;
        self.capabilities.write_options(writer, endian, ())?;
        self.max_transact_size.write_options(writer, endian, ())?;
        self.max_read_size.write_options(writer, endian, ())?;
        self.max_write_size.write_options(writer, endian, ())?;
        self.system_time.write_options(writer, endian, ())?;
        self.server_start_time.write_options(writer, endian, ())?;
        layout.security_buffer_offset.write_options(writer, endian, ())?;
        layout.security_buffer_length.write_options(writer, endian, ())?;
        layout.negotiate_context_offset.write_options(writer, endian, ())?;
        writer.write_all(&self.buffer)?;
        write_zeros(writer, layout.padding)?;
        self.negotiate_context_list().write_options(writer, endian, ())
    }
}

#[cfg(feature = "client")]
impl BinRead for NegotiateResponse {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        ensure_remaining(reader, Self::FIXED_SIZE)?;
        check_structure_size(reader, endian, Self::STRUCTURE_SIZE)?;
        let security_mode = NegotiateSecurityMode::read_options(reader, endian, ())?;
        let dialect_revision = NegotiateDialect::read_options(reader, endian, ())?;
        let negotiate_context_count = u16::read_options(reader, endian, ())?;
        let server_guid = Guid::read_options(reader, endian, ())?;
        let capabilities = GlobalCapabilities::read_options(reader, endian, ())?;
        let max_transact_size = u32::read_options(reader, endian, ())?;
        let max_read_size = u32::read_options(reader, endian, ())?;
        let max_write_size = u32::read_options(reader, endian, ())?;
        let system_time = FileTime::read_options(reader, endian, ())?;
        let server_start_time = FileTime::read_options(reader, endian, ())?;
        let security_buffer_offset = u16::read_options(reader, endian, ())?;
        let security_buffer_length = u16::read_options(reader, endian, ())?;
        let negotiate_context_offset = u32::read_options(reader, endian, ())?;
        let fixed_end = reader.stream_position()?;

        let buffer = if security_buffer_length == 0 {
            vec![]
        } else {
            if (security_buffer_offset as u64) < fixed_end {
                return Err(binrw::Error::AssertFail {
                    pos: fixed_end,
                    message: format!(
                        "security buffer offset {security_buffer_offset} points into the fixed response"
                    ),
                });
            }
            reader.seek(SeekFrom::Start(security_buffer_offset as u64))?;
            read_counted(reader, endian, (security_buffer_length as usize, 1))?
        };

        let dialect = match dialect_revision {
            NegotiateDialect::Smb0311 => {
                let contexts = if negotiate_context_count == 0 {
                    vec![]
                } else {
                    let buffer_end = match buffer.len() {
                        0 => 0,
                        len => security_buffer_offset as u64 + len as u64,
                    };
                    if (negotiate_context_offset as u64) < fixed_end.max(buffer_end) {
                        return Err(binrw::Error::AssertFail {
                            pos: fixed_end,
                            message: format!(
                                "negotiate context offset {negotiate_context_offset} overlaps the fixed response or security buffer"
                            ),
                        });
                    }
                    reader.seek(SeekFrom::Start(negotiate_context_offset as u64))?;
                    read_counted(
                        reader,
                        endian,
                        (negotiate_context_count as usize, CONTEXT_HEADER_SIZE),
                    )?
                };
                ResponseDialect::Smb0311(contexts)
            }
            // Context count & offset are reserved.
            other => ResponseDialect::Legacy(other),
        };

        Ok(NegotiateResponse {
            security_mode,
            dialect,
            server_guid,
            capabilities,
            max_transact_size,
            max_read_size,
            max_write_size,
            system_time,
            server_start_time,
            buffer,
        })
    }
}

#[cfg(test)]
mod tests {
    use const_format::concatcp;
    use smb2_tests::*;
    use time::macros::datetime;

    use super::*;
    use crate::*;

    const SERVER_GUID_HEX: &str = "b921f8e01507aa41be3867febf5e2e11";
    const GSS_TOKEN_HEX: &str = "602806062b0601050502a01e301ca01a3018060a2b06010401823702021e060a2b06010401823702020a";
    const SERVER_SALT_HEX: &str = "d5671b24a1e9ccc893f5555a3103435a852bc3cb1ad32dc51f92806ef3fb4dd4";

    /// Fixed part of a captured 3.1.1 response: 5 contexts at 0xb0, 42 bytes of token at 0x80.
    const CAPTURED_FIXED_HEX: &str = concatcp!(
        "4100 0100 1103 0500",
        SERVER_GUID_HEX,
        "2f000000 00008000 00008000 00008000 a876d878c569db01 0000000000000000",
        "8000 2a00 b0000000"
    );
    const CAPTURED_CONTEXTS_HEX: &str = concatcp!(
        "0100260000000000010020000100",
        SERVER_SALT_HEX,
        "0000",
        "0200040000000000 01000200 00000000",
        "0800040000000000 01000200 00000000",
        "07000c0000000000 020000000000000001000200 00000000",
        "03000c0000000000 020000000100000002000400"
    );
    const CAPTURED_RESPONSE_HEX: &str = concatcp!(
        CAPTURED_FIXED_HEX,
        GSS_TOKEN_HEX,
        "000000000000",
        CAPTURED_CONTEXTS_HEX
    );

    fn captured_response() -> NegotiateResponse {
        NegotiateResponse {
            security_mode: NegotiateSecurityMode::new().with_signing_enabled(true),
            dialect: ResponseDialect::Smb0311(vec![
                PreauthIntegrityCapabilities {
                    hash_algorithms: vec![HashAlgorithm::Sha512],
                    salt: hex_to_bytes(SERVER_SALT_HEX),
                }
                .into(),
                EncryptionCapabilities {
                    ciphers: vec![EncryptionCipher::Aes128Gcm],
                }
                .into(),
                NegotiateContext::Unknown {
                    context_type: 0x0008,
                    data: vec![0x01, 0x00, 0x02, 0x00],
                },
                NegotiateContext::Unknown {
                    context_type: 0x0007,
                    data: hex_to_bytes("020000000000000001000200"),
                },
                NegotiateContext::Unknown {
                    context_type: 0x0003,
                    data: hex_to_bytes("020000000100000002000400"),
                },
            ]),
            server_guid: Guid::from([
                0xb9, 0x21, 0xf8, 0xe0, 0x15, 0x7, 0xaa, 0x41, 0xbe, 0x38, 0x67, 0xfe, 0xbf,
                0x5e, 0x2e, 0x11,
            ]),
            capabilities: GlobalCapabilities::new()
                .with_dfs(true)
                .with_leasing(true)
                .with_large_mtu(true)
                .with_multi_channel(true)
                .with_directory_leasing(true),
            max_transact_size: 8388608,
            max_read_size: 8388608,
            max_write_size: 8388608,
            system_time: datetime!(2025-01-18 16:24:39.448746400).into(),
            server_start_time: FileTime::default(),
            buffer: hex_to_bytes(GSS_TOKEN_HEX),
        }
    }

    #[test]
    fn test_captured_response_read() {
        let response = decode_negotiate_response(&hex_to_bytes(CAPTURED_RESPONSE_HEX)).unwrap();
        assert_eq!(response, captured_response());
        assert_eq!(
            response.get_ctx_encryption_capabilities().unwrap().ciphers,
            vec![EncryptionCipher::Aes128Gcm]
        );
    }

    #[test]
    fn test_captured_response_write() {
        // The last context gets its alignment padding, which the capture omits.
        let bytes = encode_negotiate_response(&captured_response()).unwrap();
        assert_eq!(
            bytes,
            hex_to_bytes(concatcp!(CAPTURED_RESPONSE_HEX, "00000000"))
        );
    }

    test_response! {
        smb0302_response: NegotiateResponse {
            security_mode: NegotiateSecurityMode::new().with_signing_enabled(true),
            dialect: ResponseDialect::Legacy(NegotiateDialect::Smb0302),
            server_guid: Guid::from([
                0xb9, 0x21, 0xf8, 0xe0, 0x15, 0x7, 0xaa, 0x41, 0xbe, 0x38, 0x67, 0xfe, 0xbf,
                0x5e, 0x2e, 0x11,
            ]),
            capabilities: GlobalCapabilities::new().with_dfs(true).with_encryption(true),
            max_transact_size: 65536,
            max_read_size: 65536,
            max_write_size: 65536,
            system_time: FileTime::from(0x01db69c578d876a8u64),
            server_start_time: FileTime::default(),
            buffer: vec![0x60, 0x00],
        } => concatcp!(
            "4100 0100 0203 0000", SERVER_GUID_HEX,
            "41000000 00000100 00000100 00000100 a876d878c569db01 0000000000000000",
            "8000 0200 00000000 6000"
        )
    }

    #[test]
    fn test_legacy_response_ignores_context_fields() {
        // 3.0.2 selected, with garbage in the reserved count/offset fields
        // and context-like bytes after the token.
        let bytes = hex_to_bytes(concatcp!(
            "4100 0100 0203 0100", SERVER_GUID_HEX,
            "41000000 00000100 00000100 00000100 a876d878c569db01 0000000000000000",
            "8000 0200 88000000 6000 000000000000",
            "0200040000000000 01000200 00000000"
        ));
        let response = decode_negotiate_response(&bytes).unwrap();
        assert_eq!(
            response.dialect,
            ResponseDialect::Legacy(NegotiateDialect::Smb0302)
        );
        assert!(response.negotiate_context_list().is_empty());
        assert_eq!(response.buffer, vec![0x60, 0x00]);
    }

    #[test]
    fn test_legacy_response_never_writes_contexts() {
        let mut response = captured_response();
        response.dialect = ResponseDialect::Legacy(NegotiateDialect::Smb0302);
        let bytes = encode_negotiate_response(&response).unwrap();
        assert_eq!(&bytes[6..8], &[0, 0]);
        assert_eq!(&bytes[60..64], &[0, 0, 0, 0]);
        assert_eq!(bytes.len(), 64 + response.buffer.len());
    }

    #[test]
    fn test_smb0311_response_must_carry_contexts_variant() {
        let mut response = captured_response();
        response.dialect = ResponseDialect::Legacy(NegotiateDialect::Smb0311);
        assert!(matches!(
            encode_negotiate_response(&response),
            Err(SmbMsgError::BinRWError(_))
        ));
    }

    #[test]
    fn test_context_padding_only_with_contexts() {
        let mut response = captured_response();
        response.dialect = ResponseDialect::Smb0311(vec![]);
        let bytes = encode_negotiate_response(&response).unwrap();
        // 42 bytes of token, no padding after it.
        assert_eq!(bytes.len(), 64 + 42);
        assert_eq!(&bytes[6..8], &[0, 0]);
        assert_eq!(&bytes[60..64], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_context_offset_into_fixed_part() {
        // No token, one context claimed at offset 0.
        let bytes = hex_to_bytes(concatcp!(
            "4100 0100 1103 0100",
            SERVER_GUID_HEX,
            "2f000000 00008000 00008000 00008000 a876d878c569db01 0000000000000000",
            "0000 0000 00000000"
        ));
        assert!(matches!(
            decode_negotiate_response(&bytes),
            Err(SmbMsgError::BinRWError(binrw::Error::AssertFail { pos: 128, .. }))
        ));
    }

    #[test]
    fn test_context_offset_into_security_buffer() {
        // The token spans 0x80..0xaa.
        let mut bytes = hex_to_bytes(CAPTURED_RESPONSE_HEX);
        bytes[60..64].copy_from_slice(&0x88u32.to_le_bytes());
        assert!(matches!(
            decode_negotiate_response(&bytes),
            Err(SmbMsgError::BinRWError(_))
        ));

        bytes[60..64].copy_from_slice(&0xa8u32.to_le_bytes());
        assert!(matches!(
            decode_negotiate_response(&bytes),
            Err(SmbMsgError::BinRWError(_))
        ));
    }

    #[test]
    fn test_truncated_security_buffer() {
        let mut bytes = hex_to_bytes(CAPTURED_RESPONSE_HEX);
        bytes.truncate(80);
        assert!(matches!(
            decode_negotiate_response(&bytes),
            Err(SmbMsgError::DecodeError {
                offset: 128,
                expected: 42,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_truncated_fixed_part() {
        let bytes = hex_to_bytes(CAPTURED_FIXED_HEX);
        assert!(matches!(
            decode_negotiate_response(&bytes[..40]),
            Err(SmbMsgError::DecodeError {
                offset: 64,
                expected: 64,
                actual: 40
            })
        ));
    }

    #[test]
    fn test_unsupported_dialect_revision() {
        let mut bytes = hex_to_bytes(CAPTURED_RESPONSE_HEX);
        bytes[4] = 0x01;
        assert!(matches!(
            decode_negotiate_response(&bytes),
            Err(SmbMsgError::UnsupportedValue {
                kind: ValueKind::Dialect,
                value: 0x0301
            })
        ));
    }
}
