use std::fmt::Debug;

use super::CryptoError;
use crate::EncryptionCipher;

/// An AEAD cipher keyed for SMB3 message encryption.
pub trait EncryptingAlgo: Debug + Send {
    /// Encrypts `payload` in place, authenticating `header_data` too.
    /// Returns the 16-byte signature.
    fn encrypt(
        &mut self,
        payload: &mut [u8],
        header_data: &[u8],
        nonce: &[u8],
    ) -> Result<[u8; 16], CryptoError>;

    /// Decrypts `payload` in place, after checking `signature`.
    fn decrypt(
        &mut self,
        payload: &mut [u8],
        header_data: &[u8],
        nonce: &[u8],
        signature: &[u8; 16],
    ) -> Result<(), CryptoError>;

    /// Returns the size of the nonce required by the encryption algorithm.
    fn nonce_size(&self) -> usize;

    /// Clone the algo into a boxed trait object.
    fn clone_box(&self) -> Box<dyn EncryptingAlgo>;
}

/// The ciphers compiled into this build.
pub const ENCRYPTING_ALGOS: &[EncryptionCipher] = &[
    #[cfg(feature = "encrypt_aes128ccm")]
    EncryptionCipher::Aes128Ccm,
    #[cfg(feature = "encrypt_aes128gcm")]
    EncryptionCipher::Aes128Gcm,
];

pub fn make_encrypting_algo(
    encrypting_algorithm: EncryptionCipher,
    encrypting_key: &[u8],
) -> Result<Box<dyn EncryptingAlgo>, CryptoError> {
    match encrypting_algorithm {
        #[cfg(feature = "encrypt_aes128ccm")]
        EncryptionCipher::Aes128Ccm => aead_impl::build::<aead_impl::Aes128Ccm>(encrypting_key),
        #[cfg(feature = "encrypt_aes128gcm")]
        EncryptionCipher::Aes128Gcm => aead_impl::build::<aes_gcm::Aes128Gcm>(encrypting_key),
        _ => Err(CryptoError::UnsupportedCipher(encrypting_algorithm)),
    }
}

#[cfg(any(feature = "encrypt_aes128ccm", feature = "encrypt_aes128gcm"))]
mod aead_impl {
    use aead::{
        AeadInPlace, KeyInit, Nonce, Tag,
        consts::U16,
        generic_array::{GenericArray, typenum::Unsigned},
    };

    use super::*;

    #[cfg(feature = "encrypt_aes128ccm")]
    pub type Aes128Ccm = ccm::Ccm<aes::Aes128, U16, aead::consts::U11>;

    /// Any AEAD with a 16-byte tag, as both SMB3 ciphers are.
    #[derive(Clone)]
    pub struct AeadEncryptor<A> {
        cipher: A,
    }

    pub fn build<A>(key: &[u8]) -> Result<Box<dyn EncryptingAlgo>, CryptoError>
    where
        A: AeadInPlace<TagSize = U16> + KeyInit + Clone + Send + 'static,
    {
        let cipher = A::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        Ok(Box::new(AeadEncryptor { cipher }))
    }

    impl<A> AeadEncryptor<A>
    where
        A: AeadInPlace<TagSize = U16>,
    {
        fn nonce<'a>(&self, nonce: &'a [u8]) -> Result<&'a Nonce<A>, CryptoError> {
            let expected = A::NonceSize::USIZE;
            if nonce.len() != expected {
                return Err(CryptoError::InvalidNonceLength {
                    expected,
                    actual: nonce.len(),
                });
            }
            Ok(GenericArray::from_slice(nonce))
        }
    }

    impl<A> EncryptingAlgo for AeadEncryptor<A>
    where
        A: AeadInPlace<TagSize = U16> + Clone + Send + 'static,
    {
        fn encrypt(
            &mut self,
            payload: &mut [u8],
            header_data: &[u8],
            nonce: &[u8],
        ) -> Result<[u8; 16], CryptoError> {
            let nonce = self.nonce(nonce)?;
            let tag = self
                .cipher
                .encrypt_in_place_detached(nonce, header_data, payload)
                .map_err(|_| CryptoError::AeadError)?;
            Ok(tag.into())
        }

        fn decrypt(
            &mut self,
            payload: &mut [u8],
            header_data: &[u8],
            nonce: &[u8],
            signature: &[u8; 16],
        ) -> Result<(), CryptoError> {
            let nonce = self.nonce(nonce)?;
            let tag: &Tag<A> = GenericArray::from_slice(signature);
            self.cipher
                .decrypt_in_place_detached(nonce, header_data, payload, tag)
                .map_err(|_| CryptoError::AeadError)
        }

        fn nonce_size(&self) -> usize {
            A::NonceSize::USIZE
        }

        fn clone_box(&self) -> Box<dyn EncryptingAlgo> {
            Box::new(self.clone())
        }
    }

    impl<A> Debug for AeadEncryptor<A> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "AeadEncryptor<{}>", std::any::type_name::<A>())
        }
    }
}
