//! Strongroom Media - Error Types

use thiserror::Error;

/// Result type for vault and media operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Stable error kinds the host branches on.
///
/// Messages are for humans; hosts should only ever match on the kind
/// (or its [`code`](ErrorKind::code)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    DeletionInProgress,
    UnresolvedMediaReference,
    PartialDeletion,
    UserCancelledDeletion,
    ConsentDispatch,
    DeletionAbandoned,
    VaultIo,
    VaultCrypto,
    Decode,
    KeyDerivation,
    Platform,
    Config,
}

impl ErrorKind {
    /// Error code reported across the host bridge
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "E_INVALID_ARGUMENTS",
            ErrorKind::DeletionInProgress => "E_DELETE_IN_PROGRESS",
            ErrorKind::UnresolvedMediaReference => "E_UNRESOLVED_MEDIA",
            ErrorKind::PartialDeletion => "E_UNABLE_TO_DELETE",
            ErrorKind::UserCancelledDeletion => "E_USER_CANCELLED_DELETE",
            ErrorKind::ConsentDispatch => "E_CONSENT_DISPATCH",
            ErrorKind::DeletionAbandoned => "E_DELETE_ABANDONED",
            ErrorKind::VaultIo => "E_VAULT_IO",
            ErrorKind::VaultCrypto => "E_VAULT_CRYPTO",
            ErrorKind::Decode => "E_DECODE",
            ErrorKind::KeyDerivation => "ERR_PBEKEYGEN",
            ErrorKind::Platform => "E_PLATFORM",
            ErrorKind::Config => "E_CONFIG",
        }
    }
}

/// Vault and media error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // CALL SHAPE
    // ═══════════════════════════════════════════════════════════════

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ═══════════════════════════════════════════════════════════════
    // DELETION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Delete already in progress")]
    DeletionInProgress,

    #[error("{0} is not a valid image or video file")]
    UnresolvedMediaReference(String),

    #[error("Could not delete all media, only deleted {deleted} of {requested} items")]
    PartialDeletion { deleted: usize, requested: usize },

    #[error("The user cancelled the delete")]
    UserCancelledDeletion,

    #[error("Unable to present delete consent: {0}")]
    ConsentDispatch(String),

    #[error("Delete request abandoned before the consent outcome arrived")]
    DeletionAbandoned,

    // ═══════════════════════════════════════════════════════════════
    // VAULT ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decrypted stream for {0} was already consumed and released")]
    StreamReleased(String),

    #[error("Plaintext exceeds {max} bytes")]
    PlaintextTooLarge { max: u64 },

    #[error("Cipher error: {0}")]
    Crypto(String),

    #[error("Invalid key length: {0} bytes is not an AES key size")]
    InvalidKeyLength(usize),

    #[error("Plaintext is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // ═══════════════════════════════════════════════════════════════
    // PLATFORM / CONFIG
    // ═══════════════════════════════════════════════════════════════

    #[error("Media store error: {0}")]
    Platform(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            VaultError::DeletionInProgress => ErrorKind::DeletionInProgress,
            VaultError::UnresolvedMediaReference(_) => ErrorKind::UnresolvedMediaReference,
            VaultError::PartialDeletion { .. } => ErrorKind::PartialDeletion,
            VaultError::UserCancelledDeletion => ErrorKind::UserCancelledDeletion,
            VaultError::ConsentDispatch(_) => ErrorKind::ConsentDispatch,
            VaultError::DeletionAbandoned => ErrorKind::DeletionAbandoned,
            VaultError::Io(_) | VaultError::StreamReleased(_) | VaultError::PlaintextTooLarge { .. } => {
                ErrorKind::VaultIo
            }
            VaultError::Crypto(_) | VaultError::InvalidKeyLength(_) => ErrorKind::VaultCrypto,
            VaultError::InvalidUtf8(_) => ErrorKind::Decode,
            VaultError::KeyDerivationFailed(_) => ErrorKind::KeyDerivation,
            VaultError::Platform(_) => ErrorKind::Platform,
            VaultError::Config(_) => ErrorKind::Config,
        }
    }

    /// Host-facing error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Check if this is a security-critical error
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            VaultError::Crypto(_) | VaultError::InvalidKeyLength(_) | VaultError::KeyDerivationFailed(_)
        )
    }

    /// Check if the caller may sensibly issue the same request again.
    ///
    /// Nothing is retried automatically.
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(
            self,
            VaultError::DeletionInProgress
                | VaultError::UserCancelledDeletion
                | VaultError::ConsentDispatch(_)
                | VaultError::DeletionAbandoned
                | VaultError::PartialDeletion { .. }
        )
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Config(e.to_string())
    }
}

impl From<hex::FromHexError> for VaultError {
    fn from(e: hex::FromHexError) -> Self {
        VaultError::InvalidArgument(format!("invalid hex key: {}", e))
    }
}
