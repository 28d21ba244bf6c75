//! The outcome of a NEGOTIATE exchange, as seen by the client.
//!
//! Reference: MS-SMB2 3.2.5.2

use smb2_dtyp::Guid;

use crate::{
    ClientNegotiateRequest, Dialect, EncryptionCipher, GlobalCapabilities, HashAlgorithm,
    NegotiateContext, NegotiateResponse, NegotiateSecurityMode, SmbMsgError,
};

/// What the client and server agreed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedProperties {
    pub dialect: Dialect,
    pub server_guid: Guid,
    pub security_mode: NegotiateSecurityMode,
    pub capabilities: GlobalCapabilities,
    pub max_transact_size: u32,
    pub max_read_size: u32,
    pub max_write_size: u32,
    /// The GSS token from the response's security buffer.
    pub gss_token: Vec<u8>,
    /// Set for 3.1.1 only.
    pub preauth_hash_algorithm: Option<HashAlgorithm>,
    /// `None` when encryption is not in use, including when the server
    /// found no common cipher.
    pub cipher: Option<EncryptionCipher>,
}

impl NegotiatedProperties {
    /// Checks the server's `response` against the client's `request`,
    /// and collects the negotiated properties.
    pub fn from_exchange(
        request: &ClientNegotiateRequest,
        response: &NegotiateResponse,
    ) -> crate::Result<Self> {
        let dialect = Dialect::try_from(response.dialect_revision()).map_err(|_| {
            SmbMsgError::NegotiationError(
                "The server selected the SMB 2 wildcard dialect; a multi-protocol negotiation is required".into(),
            )
        })?;
        if !request.dialects().contains(&dialect) {
            return Err(SmbMsgError::NegotiationError(format!(
                "The server selected dialect {dialect:?}, which was not offered"
            )));
        }

        let (preauth_hash_algorithm, cipher) = if dialect == Dialect::Smb0311 {
            (
                Some(Self::select_hash_algorithm(request, response)?),
                Self::select_cipher(request, response)?,
            )
        } else if dialect.is_smb3() && response.capabilities.encryption() {
            (None, Some(EncryptionCipher::Aes128Ccm))
        } else {
            (None, None)
        };

        let negotiated = NegotiatedProperties {
            dialect,
            server_guid: response.server_guid,
            security_mode: response.security_mode,
            capabilities: response.capabilities,
            max_transact_size: response.max_transact_size,
            max_read_size: response.max_read_size,
            max_write_size: response.max_write_size,
            gss_token: response.buffer.clone(),
            preauth_hash_algorithm,
            cipher,
        };
        log::debug!(
            "Negotiated dialect {:?}, preauth hash {:?}, cipher {:?}",
            negotiated.dialect,
            negotiated.preauth_hash_algorithm,
            negotiated.cipher
        );
        Ok(negotiated)
    }

    fn select_hash_algorithm(
        request: &ClientNegotiateRequest,
        response: &NegotiateResponse,
    ) -> crate::Result<HashAlgorithm> {
        let preauth_contexts: Vec<_> = response
            .negotiate_context_list()
            .iter()
            .filter_map(|context| match context {
                NegotiateContext::PreauthIntegrityCapabilities(preauth) => Some(preauth),
                _ => None,
            })
            .collect();
        let [preauth] = preauth_contexts.as_slice() else {
            return Err(SmbMsgError::NegotiationError(format!(
                "Expected exactly one preauth integrity context, got {}",
                preauth_contexts.len()
            )));
        };
        let [algorithm] = preauth.hash_algorithms.as_slice() else {
            return Err(SmbMsgError::NegotiationError(format!(
                "Expected exactly one preauth hash algorithm, got {}",
                preauth.hash_algorithms.len()
            )));
        };

        let offered = request
            .get_ctx_preauth_integrity_capabilities()
            .is_some_and(|p| p.hash_algorithms.contains(algorithm));
        if !offered {
            return Err(SmbMsgError::NegotiationError(format!(
                "The server selected hash algorithm {algorithm:?}, which was not offered"
            )));
        }
        Ok(*algorithm)
    }

    fn select_cipher(
        request: &ClientNegotiateRequest,
        response: &NegotiateResponse,
    ) -> crate::Result<Option<EncryptionCipher>> {
        let encryption_contexts: Vec<_> = response
            .negotiate_context_list()
            .iter()
            .filter_map(|context| match context {
                NegotiateContext::EncryptionCapabilities(encryption) => Some(encryption),
                _ => None,
            })
            .collect();
        let encryption = match encryption_contexts.as_slice() {
            [] => return Ok(None),
            [encryption] => encryption,
            _ => {
                return Err(SmbMsgError::NegotiationError(format!(
                    "Expected at most one encryption context, got {}",
                    encryption_contexts.len()
                )));
            }
        };
        let [cipher] = encryption.ciphers.as_slice() else {
            return Err(SmbMsgError::NegotiationError(format!(
                "Expected exactly one cipher, got {}",
                encryption.ciphers.len()
            )));
        };

        match cipher {
            EncryptionCipher::NoCommonCipher => {
                log::debug!("The server found no common cipher");
                Ok(None)
            }
            cipher => {
                let offered = request
                    .get_ctx_encryption_capabilities()
                    .is_some_and(|e| e.ciphers.contains(cipher));
                if !offered {
                    return Err(SmbMsgError::NegotiationError(format!(
                        "The server selected cipher {cipher:?}, which was not offered"
                    )));
                }
                Ok(Some(*cipher))
            }
        }
    }
}
