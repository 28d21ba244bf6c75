//! Encoding & decoding of whole NEGOTIATE messages and message bodies.
//!
//! All wire offsets in NEGOTIATE messages are relative to the start of the
//! SMB2 header. Message bodies are therefore laid out as if a 64-byte header
//! preceded them, and decode errors report header-relative offsets.

use binrw::io::Cursor;
use binrw::prelude::*;

use crate::{ClientNegotiateRequest, Header, NegotiateResponse, Result, SmbMsgError};

/// Writes `value` as if it followed a header, and returns the bytes after that header.
fn write_after_header<T>(value: &T) -> Result<Vec<u8>>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut cursor = Cursor::new(vec![0u8; Header::STRUCT_SIZE]);
    cursor.set_position(Header::STRUCT_SIZE as u64);
    value.write_le(&mut cursor)?;
    let mut bytes = cursor.into_inner();
    Ok(bytes.split_off(Header::STRUCT_SIZE))
}

/// Reads a `T` from `body`, as if it followed a header.
fn read_after_header<T>(body: &[u8]) -> Result<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    let mut bytes = Vec::with_capacity(Header::STRUCT_SIZE + body.len());
    bytes.resize(Header::STRUCT_SIZE, 0);
    bytes.extend_from_slice(body);
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(Header::STRUCT_SIZE as u64);
    Ok(T::read_le(&mut cursor)?)
}

/// Encodes a NEGOTIATE request body, the bytes that follow the SMB2 header.
#[cfg(feature = "client")]
pub fn encode_negotiate_request(request: &ClientNegotiateRequest) -> Result<Vec<u8>> {
    let bytes = write_after_header(request)?;
    log::debug!(
        "Encoded negotiate request: {} dialects, {} contexts, {} bytes",
        request.dialects().len(),
        request.negotiate_context_list().len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Decodes a NEGOTIATE response body, the bytes that follow the SMB2 header.
#[cfg(feature = "client")]
pub fn decode_negotiate_response(body: &[u8]) -> Result<NegotiateResponse> {
    let response: NegotiateResponse = read_after_header(body)?;
    log::debug!(
        "Decoded negotiate response: dialect {:?}, {} contexts",
        response.dialect_revision(),
        response.negotiate_context_list().len()
    );
    Ok(response)
}

/// Encodes a complete NEGOTIATE request message: `header` followed by `request`.
#[cfg(feature = "client")]
pub fn encode_request_message(header: &Header, request: &ClientNegotiateRequest) -> Result<Vec<u8>> {
    if header.flags.server_to_redir() {
        return Err(SmbMsgError::InvalidData(
            "a request header must not be flagged as a response".into(),
        ));
    }
    let mut cursor = Cursor::new(Vec::new());
    header.write(&mut cursor)?;
    request.write_le(&mut cursor)?;
    Ok(cursor.into_inner())
}

/// Decodes a complete NEGOTIATE response message into its header and body.
#[cfg(feature = "client")]
pub fn decode_response_message(message: &[u8]) -> Result<(Header, NegotiateResponse)> {
    let mut cursor = Cursor::new(message);
    let header = Header::read(&mut cursor)?;
    if !header.flags.server_to_redir() {
        return Err(SmbMsgError::InvalidData(
            "the message header is not flagged as a response".into(),
        ));
    }
    let response = NegotiateResponse::read_le(&mut cursor)?;
    log::debug!(
        "Decoded negotiate response message {}: status {:#x}, dialect {:?}",
        header.message_id,
        header.status,
        response.dialect_revision()
    );
    Ok((header, response))
}

/// Decodes a NEGOTIATE request body, choosing the layout from the offered dialects.
#[cfg(feature = "server")]
pub fn decode_negotiate_request(body: &[u8]) -> Result<ClientNegotiateRequest> {
    let request: ClientNegotiateRequest = read_after_header(body)?;
    log::debug!(
        "Decoded negotiate request: dialects {:?}, {} contexts",
        request.dialects(),
        request.negotiate_context_list().len()
    );
    Ok(request)
}

/// Encodes a NEGOTIATE response body, the bytes that follow the SMB2 header.
#[cfg(feature = "server")]
pub fn encode_negotiate_response(response: &NegotiateResponse) -> Result<Vec<u8>> {
    let bytes = write_after_header(response)?;
    log::debug!(
        "Encoded negotiate response: dialect {:?}, {} bytes",
        response.dialect_revision(),
        bytes.len()
    );
    Ok(bytes)
}

/// Decodes a complete NEGOTIATE request message into its header and body.
#[cfg(feature = "server")]
pub fn decode_request_message(message: &[u8]) -> Result<(Header, ClientNegotiateRequest)> {
    let mut cursor = Cursor::new(message);
    let header = Header::read(&mut cursor)?;
    if header.flags.server_to_redir() {
        return Err(SmbMsgError::InvalidData(
            "the message header is flagged as a response".into(),
        ));
    }
    let request = ClientNegotiateRequest::read_le(&mut cursor)?;
    log::debug!(
        "Decoded negotiate request message {}: dialects {:?}",
        header.message_id,
        request.dialects()
    );
    Ok((header, request))
}

/// Encodes a complete NEGOTIATE response message: `header` followed by `response`.
#[cfg(feature = "server")]
pub fn encode_response_message(header: &Header, response: &NegotiateResponse) -> Result<Vec<u8>> {
    if !header.flags.server_to_redir() {
        return Err(SmbMsgError::InvalidData(
            "a response header must be flagged as a response".into(),
        ));
    }
    let mut cursor = Cursor::new(Vec::new());
    header.write(&mut cursor)?;
    response.write_le(&mut cursor)?;
    Ok(cursor.into_inner())
}
