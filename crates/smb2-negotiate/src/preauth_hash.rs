//! SMB 3.1.1 pre-authentication integrity hash.
//!
//! Reference: MS-SMB2 3.2.5.2, 3.3.5.4

use sha2::digest::DynDigest;

use crate::{HashAlgorithm, SmbMsgError};

pub type PreauthHashValue = Vec<u8>;

/// The running hash over the NEGOTIATE (and later SESSION_SETUP) messages:
/// `H(i) = HASH(H(i - 1) || message(i))`, starting from all zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreauthHashState {
    InProgress {
        algorithm: HashAlgorithm,
        hash: PreauthHashValue,
    },
    Finished {
        algorithm: HashAlgorithm,
        hash: PreauthHashValue,
    },
}

impl PreauthHashState {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        PreauthHashState::InProgress {
            algorithm,
            hash: vec![0; algorithm.output_size()],
        }
    }

    /// Feeds a complete message, header included.
    pub fn next(self, message: &[u8]) -> crate::Result<Self> {
        match self {
            PreauthHashState::InProgress { algorithm, hash } => {
                let mut hasher = algorithm.implementation();
                hasher.update(&hash);
                hasher.update(message);
                let hash = hasher.finalize().into_vec();
                log::trace!("Preauth hash updated with {} bytes", message.len());
                Ok(PreauthHashState::InProgress { algorithm, hash })
            }
            PreauthHashState::Finished { .. } => Err(SmbMsgError::InvalidData(
                "Preauth hash is already finished".into(),
            )),
        }
    }

    pub fn finish(self) -> Self {
        match self {
            PreauthHashState::InProgress { algorithm, hash } => {
                PreauthHashState::Finished { algorithm, hash }
            }
            finished => finished,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            PreauthHashState::InProgress { algorithm, .. }
            | PreauthHashState::Finished { algorithm, .. } => *algorithm,
        }
    }

    /// The hash so far, finished or not.
    pub fn current_hash(&self) -> &[u8] {
        match self {
            PreauthHashState::InProgress { hash, .. } | PreauthHashState::Finished { hash, .. } => {
                hash
            }
        }
    }

    /// The final hash, once [`finish`][Self::finish] was called.
    pub fn final_hash(&self) -> Option<&[u8]> {
        match self {
            PreauthHashState::Finished { hash, .. } => Some(hash),
            PreauthHashState::InProgress { .. } => None,
        }
    }
}

impl Default for PreauthHashState {
    fn default() -> PreauthHashState {
        PreauthHashState::new(HashAlgorithm::Sha512)
    }
}
