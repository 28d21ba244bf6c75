//! Errors of the negotiate codec.

use std::fmt;

use thiserror::Error;

use crate::{crypto::CryptoError, negotiate::NegotiateDialect};

/// The kind of 16-bit wire value that failed to map to a known variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Command,
    Dialect,
    ContextType,
    Cipher,
    HashAlgorithm,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Command => "command",
            ValueKind::Dialect => "dialect",
            ValueKind::ContextType => "negotiate context type",
            ValueKind::Cipher => "encryption cipher",
            ValueKind::HashAlgorithm => "hash algorithm",
        };
        write!(f, "{name}")
    }
}

/// A failure raised while reading a message.
///
/// Travels inside [`binrw::Error::Custom`] through the binrw readers,
/// and is restored when the binrw error is converted into an [`SmbMsgError`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    #[error("expected {expected} bytes at offset {offset}, but only {actual} are available")]
    Truncated {
        offset: u64,
        expected: u64,
        actual: u64,
    },
    #[error("unsupported {kind} value {value:#06x}")]
    Unsupported { kind: ValueKind, value: u16 },
}

impl DecodeFailure {
    /// Wraps the failure into a binrw error at stream position `pos`.
    pub(crate) fn at(self, pos: u64) -> binrw::Error {
        binrw::Error::Custom {
            pos,
            err: Box::new(self),
        }
    }
}

#[derive(Error, Debug)]
pub enum SmbMsgError {
    /// The buffer ends before a field or a declared region does.
    ///
    /// `offset` is relative to the start of the SMB2 header.
    #[error("Decode error at offset {offset}: expected {expected} bytes, {actual} available")]
    DecodeError {
        offset: u64,
        expected: u64,
        actual: u64,
    },
    #[error("Unsupported {kind} value: {value:#06x}")]
    UnsupportedValue { kind: ValueKind, value: u16 },
    #[error("Invalid dialect: {0:?}")]
    InvalidDialect(NegotiateDialect),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Negotiation error: {0}")]
    NegotiationError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Binrw Error: {0}")]
    BinRWError(binrw::Error),
}

impl From<DecodeFailure> for SmbMsgError {
    fn from(value: DecodeFailure) -> Self {
        match value {
            DecodeFailure::Truncated {
                offset,
                expected,
                actual,
            } => SmbMsgError::DecodeError {
                offset,
                expected,
                actual,
            },
            DecodeFailure::Unsupported { kind, value } => {
                SmbMsgError::UnsupportedValue { kind, value }
            }
        }
    }
}

impl From<binrw::Error> for SmbMsgError {
    fn from(value: binrw::Error) -> Self {
        match value.root_cause().custom_err::<DecodeFailure>() {
            Some(failure) => (*failure).into(),
            None => SmbMsgError::BinRWError(value),
        }
    }
}
