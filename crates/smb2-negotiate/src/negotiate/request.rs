//! NEGOTIATE requests, in their legacy and SMB 3.x layouts.

use binrw::io::{Read, Seek, SeekFrom, Write};
use binrw::prelude::*;
use binrw::Endian;
use smb2_dtyp::{Guid, binrw_util::prelude::*};
use smb2_negotiate_derive::smb_request;

use super::{
    CONTEXT_HEADER_SIZE, Dialect, GlobalCapabilities, NegotiateContext, NegotiateSecurityMode,
};
#[cfg(feature = "client")]
use crate::wire::{alignment_padding, narrow, write_zeros};
#[cfg(feature = "server")]
use crate::wire::{check_structure_size, ensure_remaining};
use crate::wire::read_counted;

/// SMB2 NEGOTIATE Request, without negotiate contexts.
///
/// Used by clients whose highest dialect is below 3.1.1.
///
/// Reference: MS-SMB2 2.2.3
#[smb_request(size = 36)]
pub struct NegotiateRequest {
    #[bw(try_calc(u16::try_from(dialects.len())))]
    #[br(temp)]
    dialect_count: u16,
    /// Security mode flags indicating signing requirements.
    pub security_mode: NegotiateSecurityMode,
    reserved: u16,
    /// Client capabilities.
    pub capabilities: GlobalCapabilities,
    /// Client GUID, used to identify the client.
    pub client_guid: Guid,
    /// Time the client started; zero when unused.
    pub client_start_time: FileTime,
    /// List of SMB dialects supported by the client.
    #[br(parse_with = read_counted, args(dialect_count as usize, 2))]
    pub dialects: Vec<Dialect>,
}

/// SMB2 NEGOTIATE Request, SMB 3.x layout.
///
/// Carries the negotiate context fields in place of `ClientStartTime`,
/// followed by the dialects, alignment padding and the context list.
/// Offsets and counts are derived from the lists when writing.
///
/// Reference: MS-SMB2 2.2.3
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smb3NegotiateRequest {
    pub security_mode: NegotiateSecurityMode,
    pub capabilities: GlobalCapabilities,
    pub client_guid: Guid,
    pub dialects: Vec<Dialect>,
    /// Negotiate contexts, sent when the dialects include 3.1.1.
    pub negotiate_context_list: Vec<NegotiateContext>,
}

impl Smb3NegotiateRequest {
    pub const STRUCTURE_SIZE: u16 = 36;

    pub fn negotiate_context_list(&self) -> &[NegotiateContext] {
        &self.negotiate_context_list
    }
}

/// Counts, padding & context offset of an [`Smb3NegotiateRequest`],
/// all computed before the first byte is written.
#[cfg(feature = "client")]
#[derive(Debug, PartialEq, Eq)]
struct Smb3RequestLayout {
    dialect_count: u16,
    padding: u64,
    negotiate_context_offset: u32,
    negotiate_context_count: u16,
}

#[cfg(feature = "client")]
impl Smb3RequestLayout {
    /// `start` is the position of the request in the stream,
    /// which makes the offset relative to the stream start (the header).
    fn new(start: u64, request: &Smb3NegotiateRequest) -> BinResult<Self> {
        // Readers pick this layout by the 3.1.1 dialect; without it, the
        // context fields would be read back as ClientStartTime.
        if !request.dialects.contains(&Dialect::Smb0311) {
            return Err(binrw::Error::AssertFail {
                pos: start,
                message: "an SMB 3.x negotiate request must offer dialect 3.1.1".into(),
            });
        }
        let dialect_count: u16 = narrow(request.dialects.len() as u64, start, "dialect count")?;
        let negotiate_context_count: u16 = narrow(
            request.negotiate_context_list.len() as u64,
            start,
            "negotiate context count",
        )?;

        let dialects_end =
            start + Smb3NegotiateRequest::STRUCTURE_SIZE as u64 + 2 * dialect_count as u64;
        let (padding, negotiate_context_offset) = if negotiate_context_count == 0 {
            (0, 0)
        } else {
            let padding = alignment_padding(dialects_end);
            (padding, dialects_end + padding)
        };

        Ok(Smb3RequestLayout {
            dialect_count,
            padding,
            negotiate_context_offset: narrow(
                negotiate_context_offset,
                start,
                "negotiate context offset",
            )?,
            negotiate_context_count,
        })
    }
}

#[cfg(feature = "client")]
impl BinWrite for Smb3NegotiateRequest {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        let start = writer.stream_position()?;
        let layout = Smb3RequestLayout::new(start, self)?;
        log::trace!("Writing SMB 3.x negotiate request with layout {layout:?}");

        Self::STRUCTURE_SIZE.write_options(writer, endian, ())?;
        layout.dialect_count.write_options(writer, endian, ())?;
        self.security_mode.write_options(writer, endian, ())?;
        0u16.write_options(writer, endian, ())?;
        self.capabilities.write_options(writer, endian, ())?;
        self.client_guid.write_options(writer, endian, ())?;
        layout.negotiate_context_offset.write_options(writer, endian, ())?;
        layout.negotiate_context_count.write_options(writer, endian, ())?;
        0u16.write_options(writer, endian, ())?;
        self.dialects.write_options(writer, endian, ())?;
        write_zeros(writer, layout.padding)?;
        self.negotiate_context_list.write_options(writer, endian, ())
    }
}

#[cfg(feature = "server")]
impl BinRead for Smb3NegotiateRequest {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        ensure_remaining(reader, Self::STRUCTURE_SIZE as u64)?;
        check_structure_size(reader, endian, Self::STRUCTURE_SIZE)?;
        let dialect_count = u16::read_options(reader, endian, ())?;
        let security_mode = NegotiateSecurityMode::read_options(reader, endian, ())?;
        let _reserved = u16::read_options(reader, endian, ())?;
        let capabilities = GlobalCapabilities::read_options(reader, endian, ())?;
        let client_guid = Guid::read_options(reader, endian, ())?;
        let negotiate_context_offset = u32::read_options(reader, endian, ())?;
        let negotiate_context_count = u16::read_options(reader, endian, ())?;
        let _reserved2 = u16::read_options(reader, endian, ())?;
        let dialects = read_counted(reader, endian, (dialect_count as usize, 2))?;

        let negotiate_context_list = if negotiate_context_count == 0 {
            vec![]
        } else {
            let dialects_end = reader.stream_position()?;
            if (negotiate_context_offset as u64) < dialects_end {
                return Err(binrw::Error::AssertFail {
                    pos: dialects_end,
                    message: format!(
                        "negotiate context offset {negotiate_context_offset} points into the dialects"
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

        Ok(Smb3NegotiateRequest {
            security_mode,
            capabilities,
            client_guid,
            dialects,
            negotiate_context_list,
        })
    }
}

/// A NEGOTIATE request in either of its layouts.
///
/// Servers tell the layouts apart by the dialect list: a request offering
/// 3.1.1 uses the SMB 3.x layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNegotiateRequest {
    Smb2(NegotiateRequest),
    Smb3(Smb3NegotiateRequest),
}

impl ClientNegotiateRequest {
    pub fn dialects(&self) -> &[Dialect] {
        match self {
            ClientNegotiateRequest::Smb2(request) => &request.dialects,
            ClientNegotiateRequest::Smb3(request) => &request.dialects,
        }
    }

    pub fn security_mode(&self) -> NegotiateSecurityMode {
        match self {
            ClientNegotiateRequest::Smb2(request) => request.security_mode,
            ClientNegotiateRequest::Smb3(request) => request.security_mode,
        }
    }

    pub fn capabilities(&self) -> GlobalCapabilities {
        match self {
            ClientNegotiateRequest::Smb2(request) => request.capabilities,
            ClientNegotiateRequest::Smb3(request) => request.capabilities,
        }
    }

    pub fn client_guid(&self) -> Guid {
        match self {
            ClientNegotiateRequest::Smb2(request) => request.client_guid,
            ClientNegotiateRequest::Smb3(request) => request.client_guid,
        }
    }

    /// The negotiate contexts of the request; always empty for the legacy layout.
    pub fn negotiate_context_list(&self) -> &[NegotiateContext] {
        match self {
            ClientNegotiateRequest::Smb2(_) => &[],
            ClientNegotiateRequest::Smb3(request) => &request.negotiate_context_list,
        }
    }
}

impl From<NegotiateRequest> for ClientNegotiateRequest {
    fn from(value: NegotiateRequest) -> Self {
        ClientNegotiateRequest::Smb2(value)
    }
}

impl From<Smb3NegotiateRequest> for ClientNegotiateRequest {
    fn from(value: Smb3NegotiateRequest) -> Self {
        ClientNegotiateRequest::Smb3(value)
    }
}

#[cfg(feature = "client")]
impl BinWrite for ClientNegotiateRequest {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        match self {
            ClientNegotiateRequest::Smb2(request) => request.write_options(writer, endian, ()),
            ClientNegotiateRequest::Smb3(request) => request.write_options(writer, endian, ()),
        }
    }
}

#[cfg(feature = "server")]
impl BinRead for ClientNegotiateRequest {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let start = reader.stream_position()?;
        ensure_remaining(reader, Smb3NegotiateRequest::STRUCTURE_SIZE as u64)?;

        // Both layouts agree up to the dialects; the legacy one reads the
        // context fields as ClientStartTime.
        let legacy = NegotiateRequest::read_options(reader, endian, ())?;
        if !legacy.dialects.contains(&Dialect::Smb0311) {
            return Ok(ClientNegotiateRequest::Smb2(legacy));
        }

        reader.seek(SeekFrom::Start(start))?;
        Ok(ClientNegotiateRequest::Smb3(Smb3NegotiateRequest::read_options(
            reader,
            endian,
            (),
        )?))
    }
}
