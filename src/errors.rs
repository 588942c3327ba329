use thiserror::Error;

/// All errors that can occur in the API key vault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Configuration errors ---
    #[error("Master key is not configured — set the {0} environment variable")]
    MissingMasterKey(&'static str),

    #[error("Master key must be at least {0} characters long")]
    MasterKeyTooShort(usize),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Cipher errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong master key or corrupted data")]
    DecryptionFailed,

    #[error("API key value cannot be empty")]
    EmptyPlaintext,

    #[error("Invalid API key format: {0}")]
    InvalidKeyFormat(String),

    // --- Vault errors ---
    #[error("API key '{0}' not found")]
    KeyNotFound(String),

    #[error("API key '{0}' already exists")]
    KeyAlreadyExists(String),

    #[error("Unknown service type '{0}'")]
    UnknownServiceType(String),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Audit error: {0}")]
    AuditError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

/// Convenience type alias for vault results.
pub type Result<T> = std::result::Result<T, VaultError>;
