//! Negotiate contexts (SMB 3.1.1).
//!
//! Reference: MS-SMB2 2.2.3.1

use binrw::Endian;
use binrw::io::{Cursor, Read, Seek, SeekFrom, Write};
use binrw::prelude::*;
use smb2_negotiate_derive::smb_message_binrw;

use super::{ClientNegotiateRequest, NegotiateResponse, Smb3NegotiateRequest};
use crate::{
    DecodeFailure,
    wire::{alignment_padding, ensure_remaining, narrow, read_counted, wire_enum, write_zeros},
};

/// Size of the fixed part of a context: type, data length & reserved.
pub const CONTEXT_HEADER_SIZE: u64 = 8;

macro_rules! negotiate_context_type {
    ($($name:ident = $id:literal,)+) => {
wire_enum! {
    /// Negotiate context type identifiers.
    ///
    /// Reference: MS-SMB2 2.2.3.1
    pub enum NegotiateContextType: ContextType {
        $(
            $name = $id,
        )+
    }
}

/// A single negotiate context item.
///
/// Build known contexts from their payload:
/// ```
/// # use smb2_negotiate::*;
/// let ctx: NegotiateContext = EncryptionCapabilities {
///     ciphers: vec![EncryptionCipher::Aes128Gcm]
/// }.into();
/// assert_eq!(ctx.context_type_value(), 2);
/// ```
///
/// Contexts of types this crate does not know are kept as raw bytes
/// in [`NegotiateContext::Unknown`], and written back as-is.
///
/// On the wire, every context is followed by zero padding up to the next
/// 8-byte boundary. The padding of the last context of a message may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiateContext {
    $(
        $name($name),
    )+
    Unknown { context_type: u16, data: Vec<u8> },
}

impl NegotiateContext {
    /// The raw context type of this context.
    pub fn context_type_value(&self) -> u16 {
        match self {
            $(
                NegotiateContext::$name(_) => NegotiateContextType::$name as u16,
            )+
            NegotiateContext::Unknown { context_type, .. } => *context_type,
        }
    }

    /// The type of this context; fails for [`NegotiateContext::Unknown`] contexts.
    pub fn context_type(&self) -> crate::Result<NegotiateContextType> {
        NegotiateContextType::try_from(self.context_type_value())
    }

    fn write_data<W: Write + Seek>(&self, writer: &mut W, endian: Endian) -> BinResult<()> {
        match self {
            $(
                NegotiateContext::$name(value) => value.write_options(writer, endian, ()),
            )+
            NegotiateContext::Unknown { data, .. } => data.write_options(writer, endian, ()),
        }
    }

    fn read_data<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        context_type: u16,
        data_length: u16,
    ) -> BinResult<Self> {
        match NegotiateContextType::try_from(context_type) {
            $(
                Ok(NegotiateContextType::$name) => {
                    Ok(NegotiateContext::$name($name::read_options(reader, endian, ())?))
                }
            )+
            Err(_) => {
                log::warn!("Keeping negotiate context of unknown type {context_type:#06x} as raw data");
                let data = read_counted(reader, endian, (data_length as usize, 1))?;
                Ok(NegotiateContext::Unknown { context_type, data })
            }
        }
    }
}

$(
    impl From<$name> for NegotiateContext {
        fn from(val: $name) -> Self {
            NegotiateContext::$name(val)
        }
    }
)+

/// (Internal) Macro to generate impls for getting negotiate contexts from messages.
macro_rules! gen_impl_for_neg_msg_type {
    ($msg_type:ident) => {

impl $msg_type {
    $(
        pastey::paste! {
            #[doc = concat!("Gets the negotiate context of type [`", stringify!($name), "`] if present.")]
            pub fn [<get_ctx_ $name:snake>] (&self) -> Option<& $name> {
                self.negotiate_context_list().iter().find_map(|context| match context {
                    NegotiateContext::$name(value) => Some(value),
                    _ => None,
                })
            }
        }
    )+
}

    }
}

gen_impl_for_neg_msg_type!(Smb3NegotiateRequest);
gen_impl_for_neg_msg_type!(ClientNegotiateRequest);
gen_impl_for_neg_msg_type!(NegotiateResponse);
    };
}

negotiate_context_type!(
    PreauthIntegrityCapabilities = 0x0001,
    EncryptionCapabilities = 0x0002,
);

impl NegotiateContext {
    /// Encodes the payload alone, to learn its length before the envelope is written.
    fn data_bytes(&self, endian: Endian) -> BinResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_data(&mut cursor, endian)?;
        Ok(cursor.into_inner())
    }
}

impl BinWrite for NegotiateContext {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        let pos = writer.stream_position()?;
        let data = self.data_bytes(endian)?;
        let data_length: u16 = narrow(data.len() as u64, pos, "negotiate context data length")?;

        self.context_type_value().write_options(writer, endian, ())?;
        data_length.write_options(writer, endian, ())?;
        0u32.write_options(writer, endian, ())?;
        writer.write_all(&data)?;
        write_zeros(writer, alignment_padding(data.len() as u64))?;

        log::trace!(
            "Wrote negotiate context {:#06x} with {} data bytes at {}",
            self.context_type_value(),
            data_length,
            pos
        );
        Ok(())
    }
}

impl BinRead for NegotiateContext {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        ensure_remaining(reader, CONTEXT_HEADER_SIZE)?;
        let context_type = u16::read_options(reader, endian, ())?;
        let data_length = u16::read_options(reader, endian, ())?;
        let _reserved = u32::read_options(reader, endian, ())?;

        ensure_remaining(reader, data_length as u64)?;
        let data_start = reader.stream_position()?;
        let context = Self::read_data(reader, endian, context_type, data_length)?;

        // A payload must not reach past its declared length.
        let consumed = reader.stream_position()? - data_start;
        if consumed > data_length as u64 {
            return Err(DecodeFailure::Truncated {
                offset: data_start,
                expected: consumed,
                actual: data_length as u64,
            }
            .at(data_start));
        }

        // Skip the rest of the data and the padding. The last context may come without padding.
        let data_end = data_start + data_length as u64;
        let stream_end = reader.seek(SeekFrom::End(0))?;
        let next = (data_end + alignment_padding(data_length as u64)).min(stream_end);
        reader.seek(SeekFrom::Start(next))?;

        Ok(context)
    }
}

/// Decodes one context from the start of `buffer`, returning it with the rest of the buffer.
///
/// The rest of the buffer starts after the context's alignment padding.
pub fn decode_negotiate_context(buffer: &[u8]) -> crate::Result<(NegotiateContext, &[u8])> {
    let mut cursor = Cursor::new(buffer);
    let context = NegotiateContext::read_le(&mut cursor)?;
    let consumed = cursor.position() as usize;
    Ok((context, &buffer[consumed..]))
}

/// Encodes one context, including its trailing alignment padding.
pub fn encode_negotiate_context(context: &NegotiateContext) -> crate::Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    context.write_le(&mut cursor)?;
    Ok(cursor.into_inner())
}

wire_enum! {
    /// Hash algorithms for pre-authentication integrity.
    ///
    /// Reference: MS-SMB2 2.2.3.1.1
    pub enum HashAlgorithm: HashAlgorithm {
        Sha512 = 0x0001,
    }
}

/// (Context) Pre-authentication integrity capabilities.
///
/// Specifies the hash algorithm and salt used for pre-authentication integrity.
///
/// Reference: MS-SMB2 2.2.3.1.1
#[smb_message_binrw]
pub struct PreauthIntegrityCapabilities {
    #[bw(try_calc(u16::try_from(hash_algorithms.len())))]
    #[br(temp)]
    hash_algorithm_count: u16,
    #[bw(try_calc(u16::try_from(salt.len())))]
    #[br(temp)]
    salt_length: u16,
    /// Supported hash algorithms for pre-authentication integrity.
    #[br(parse_with = read_counted, args(hash_algorithm_count as usize, 2))]
    pub hash_algorithms: Vec<HashAlgorithm>,
    /// Salt value for pre-authentication integrity.
    #[br(parse_with = read_counted, args(salt_length as usize, 1))]
    pub salt: Vec<u8>,
}

/// (Context) Encryption capabilities.
///
/// Specifies the encryption ciphers supported by the client or server.
///
/// Reference: MS-SMB2 2.2.3.1.2
#[smb_message_binrw]
pub struct EncryptionCapabilities {
    #[bw(try_calc(u16::try_from(ciphers.len())))]
    #[br(temp)]
    cipher_count: u16,
    /// Supported encryption ciphers in preference order.
    #[br(parse_with = read_counted, args(cipher_count as usize, 2))]
    pub ciphers: Vec<EncryptionCipher>,
}

wire_enum! {
    /// Encryption cipher identifiers.
    ///
    /// `NoCommonCipher` is only sent by a server that shares no cipher with the client.
    ///
    /// Reference: MS-SMB2 2.2.3.1.2
    pub enum EncryptionCipher: Cipher {
        NoCommonCipher = 0x0000,
        Aes128Ccm = 0x0001,
        Aes128Gcm = 0x0002,
    }
}
