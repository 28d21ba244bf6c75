//! Implementations behind the negotiated hash algorithm & cipher ids.

use sha2::{Sha512, digest::DynDigest};
use thiserror::Error;

use crate::{EncryptionCipher, HashAlgorithm, SmbMsgError, ValueKind};

mod encryption;

pub use encryption::{ENCRYPTING_ALGOS, EncryptingAlgo, make_encrypting_algo};

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Unsupported cipher: {0:?}")]
    UnsupportedCipher(EncryptionCipher),
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(usize),
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },
    #[error("AEAD operation failed")]
    AeadError,
}

impl HashAlgorithm {
    /// Looks up the hash implementation of a raw algorithm id.
    pub fn get_algorithm(id: u16) -> crate::Result<Box<dyn DynDigest + Send>> {
        Ok(HashAlgorithm::try_from(id)?.implementation())
    }

    /// A fresh hasher of this algorithm.
    pub fn implementation(&self) -> Box<dyn DynDigest + Send> {
        match self {
            HashAlgorithm::Sha512 => Box::new(Sha512::default()),
        }
    }

    /// The digest size, in bytes.
    pub fn output_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha512 => 64,
        }
    }
}

/// Describes the implementation of an encryption cipher,
/// and builds keyed instances of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherImplementation {
    cipher: EncryptionCipher,
}

impl CipherImplementation {
    /// All the supported ciphers use 128-bit keys.
    pub const KEY_SIZE: usize = 16;
    pub const TAG_SIZE: usize = 16;

    pub fn cipher(&self) -> EncryptionCipher {
        self.cipher
    }

    /// Nonce size of the cipher, in bytes.
    pub fn nonce_size(&self) -> usize {
        match self.cipher {
            EncryptionCipher::Aes128Ccm => 11,
            _ => 12,
        }
    }

    /// Builds the cipher with `key`; fails if it was not compiled in.
    pub fn build(&self, key: &[u8]) -> Result<Box<dyn EncryptingAlgo>, CryptoError> {
        make_encrypting_algo(self.cipher, key)
    }
}

impl EncryptionCipher {
    /// Looks up the implementation of a raw cipher id.
    ///
    /// [`EncryptionCipher::NoCommonCipher`] has no implementation.
    pub fn get_cipher(id: u16) -> crate::Result<CipherImplementation> {
        match EncryptionCipher::try_from(id)? {
            EncryptionCipher::NoCommonCipher => Err(SmbMsgError::UnsupportedValue {
                kind: ValueKind::Cipher,
                value: id,
            }),
            cipher => Ok(CipherImplementation { cipher }),
        }
    }

    /// The ciphers that can actually be built, in preference order: GCM, then CCM.
    pub fn supported_ciphers() -> Vec<EncryptionCipher> {
        const PREFERENCE: [EncryptionCipher; 2] =
            [EncryptionCipher::Aes128Gcm, EncryptionCipher::Aes128Ccm];

        PREFERENCE
            .into_iter()
            .filter(|&cipher| {
                let available =
                    make_encrypting_algo(cipher, &[0; CipherImplementation::KEY_SIZE]).is_ok();
                if !available {
                    log::trace!("Cipher {cipher:?} is not available");
                }
                available
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_algorithm() {
        let mut hasher = HashAlgorithm::get_algorithm(0x0001).unwrap();
        hasher.update(b"abc");
        let digest = hasher.finalize();
        assert_eq!(digest.len(), HashAlgorithm::Sha512.output_size());
        assert_eq!(&digest[..4], &[0xdd, 0xaf, 0x35, 0xa1]);

        assert!(matches!(
            HashAlgorithm::get_algorithm(0x0002),
            Err(SmbMsgError::UnsupportedValue {
                kind: ValueKind::HashAlgorithm,
                value: 2
            })
        ));
    }

    #[test]
    fn test_get_cipher() {
        let ccm = EncryptionCipher::get_cipher(0x0001).unwrap();
        assert_eq!(ccm.cipher(), EncryptionCipher::Aes128Ccm);
        assert_eq!(ccm.nonce_size(), 11);
        let gcm = EncryptionCipher::get_cipher(0x0002).unwrap();
        assert_eq!(gcm.cipher(), EncryptionCipher::Aes128Gcm);
        assert_eq!(gcm.nonce_size(), 12);

        for id in [0x0000, 0x0003, 0xffff] {
            assert!(matches!(
                EncryptionCipher::get_cipher(id),
                Err(SmbMsgError::UnsupportedValue {
                    kind: ValueKind::Cipher,
                    ..
                })
            ));
        }
    }

    #[test]
    #[cfg(all(feature = "encrypt_aes128gcm", feature = "encrypt_aes128ccm"))]
    fn test_supported_ciphers_preference_order() {
        assert_eq!(
            EncryptionCipher::supported_ciphers(),
            vec![EncryptionCipher::Aes128Gcm, EncryptionCipher::Aes128Ccm]
        );
    }

    #[test]
    fn test_supported_ciphers_match_compiled_in() {
        let supported = EncryptionCipher::supported_ciphers();
        assert_eq!(supported.len(), ENCRYPTING_ALGOS.len());
        assert!(supported.iter().all(|c| ENCRYPTING_ALGOS.contains(c)));
    }
}
