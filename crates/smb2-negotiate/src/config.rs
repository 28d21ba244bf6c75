//! Client-side negotiation settings, and building the NEGOTIATE request from them.

use rand::{RngCore, rngs::OsRng};
use smb2_dtyp::{Guid, binrw_util::prelude::FileTime};

use crate::{
    ClientNegotiateRequest, Dialect, EncryptionCapabilities, EncryptionCipher, GlobalCapabilities,
    HashAlgorithm, NegotiateContext, NegotiateRequest, NegotiateSecurityMode,
    PreauthIntegrityCapabilities, Smb3NegotiateRequest, SmbMsgError,
};

/// Specifies the encryption mode for the connection.
///
/// Use this as part of the [`NegotiateConfig`] to specify the encryption mode for the connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncryptionMode {
    /// Encryption is allowed but not required, it's up to the server to decide.
    #[default]
    Allowed,
    /// Encryption is required, and negotiation fails if it cannot be offered.
    Required,
    /// Encryption is disabled, no encryption capability or context is sent.
    Disabled,
}

impl EncryptionMode {
    /// Returns true if encryption is required.
    pub fn is_required(&self) -> bool {
        matches!(self, EncryptionMode::Required)
    }

    /// Returns true if encryption is disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, EncryptionMode::Disabled)
    }
}

/// Specifies what a client offers in its NEGOTIATE request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiateConfig {
    /// The lowest dialect to offer.
    pub min_dialect: Dialect,
    /// The highest dialect to offer.
    ///
    /// Note, that the minimum dialect must be less than or equal to the maximum dialect.
    pub max_dialect: Dialect,

    /// Sets the encryption mode for the connection.
    /// See [EncryptionMode] for more information.
    pub encryption_mode: EncryptionMode,

    /// Whether to set `signing_required` in the security mode.
    /// Signing is always flagged as enabled.
    pub signing_required: bool,

    /// Specifies the GUID of the client to be used in the negotiate request.
    /// If not set, a random GUID will be generated.
    pub client_guid: Option<Guid>,

    /// Replaces the capabilities computed from the offered dialects.
    pub capabilities_override: Option<GlobalCapabilities>,
}

impl Default for NegotiateConfig {
    fn default() -> Self {
        NegotiateConfig {
            min_dialect: Dialect::MIN,
            max_dialect: Dialect::MAX,
            encryption_mode: EncryptionMode::default(),
            signing_required: false,
            client_guid: None,
            capabilities_override: None,
        }
    }
}

impl NegotiateConfig {
    /// Length of the random preauth integrity salt.
    pub const SALT_SIZE: usize = 32;

    /// Validates the configuration settings.
    pub fn validate(&self) -> crate::Result<()> {
        if self.min_dialect > self.max_dialect {
            return Err(SmbMsgError::InvalidConfiguration(format!(
                "Minimum dialect {:?} is greater than maximum dialect {:?}",
                self.min_dialect, self.max_dialect
            )));
        }
        if self.encryption_mode.is_required() && !self.max_dialect.is_smb3() {
            return Err(SmbMsgError::InvalidConfiguration(format!(
                "Encryption is required, but the maximum dialect {:?} does not support it",
                self.max_dialect
            )));
        }
        Ok(())
    }

    /// The dialects to offer, in ascending order.
    pub fn dialects(&self) -> Vec<Dialect> {
        Dialect::ALL
            .iter()
            .copied()
            .filter(|d| (self.min_dialect..=self.max_dialect).contains(d))
            .collect()
    }

    /// Builds the NEGOTIATE request described by this configuration.
    ///
    /// The SMB 3.x layout, with negotiate contexts, is used when 3.1.1 is offered.
    pub fn build_request(&self) -> crate::Result<ClientNegotiateRequest> {
        self.validate()?;

        let dialects = self.dialects();
        let security_mode = NegotiateSecurityMode::new()
            .with_signing_enabled(true)
            .with_signing_required(self.signing_required);
        let capabilities = self
            .capabilities_override
            .unwrap_or_else(|| self.capabilities_mask(&dialects));
        let client_guid = self.client_guid.unwrap_or_else(Guid::generate);

        let request: ClientNegotiateRequest = if self.max_dialect == Dialect::Smb0311 {
            Smb3NegotiateRequest {
                security_mode,
                capabilities,
                client_guid,
                dialects,
                negotiate_context_list: self.negotiate_contexts()?,
            }
            .into()
        } else {
            NegotiateRequest {
                security_mode,
                capabilities,
                client_guid,
                client_start_time: FileTime::now(),
                dialects,
            }
            .into()
        };

        log::debug!(
            "Built negotiate request: dialects {:?}, capabilities {:?}, {} contexts",
            request.dialects(),
            request.capabilities(),
            request.negotiate_context_list().len()
        );
        Ok(request)
    }

    fn capabilities_mask(&self, dialects: &[Dialect]) -> GlobalCapabilities {
        if !self.max_dialect.is_smb3() {
            return GlobalCapabilities::new();
        }

        let mut mask = GlobalCapabilities::new()
            .with_dfs(true)
            .with_leasing(true)
            .with_large_mtu(true)
            .with_multi_channel(true)
            .with_persistent_handles(true)
            .with_directory_leasing(true);

        // 3.1.1 negotiates encryption through a context instead.
        mask.set_encryption(
            !self.encryption_mode.is_disabled()
                && dialects
                    .iter()
                    .any(|d| matches!(d, Dialect::Smb030 | Dialect::Smb0302)),
        );
        mask.set_notifications(dialects.contains(&Dialect::Smb0311));

        mask
    }

    fn negotiate_contexts(&self) -> crate::Result<Vec<NegotiateContext>> {
        let mut salt = vec![0u8; Self::SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        let mut contexts = vec![
            PreauthIntegrityCapabilities {
                hash_algorithms: vec![HashAlgorithm::Sha512],
                salt,
            }
            .into(),
        ];

        if !self.encryption_mode.is_disabled() {
            let ciphers = EncryptionCipher::supported_ciphers();
            if ciphers.is_empty() {
                if self.encryption_mode.is_required() {
                    return Err(SmbMsgError::NegotiationError(
                        "Encryption is required, but no cipher is available".into(),
                    ));
                }
                log::warn!("No cipher is available, not offering encryption");
            } else {
                contexts.push(EncryptionCapabilities { ciphers }.into());
            }
        }

        Ok(contexts)
    }
}
