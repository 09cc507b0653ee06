//! Error types for optmodel-core

/// Result type for optmodel-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while registering models or resolving options
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two models were registered under the same identity
    #[error("Options model with id \"{id}\" was already defined")]
    DuplicateModel { id: String },

    /// Model identity is empty or contains the path separator
    #[error("Invalid model id \"{id}\": must be non-empty and must not contain '/'")]
    InvalidModelId { id: String },

    /// No model registered under the requested identity
    #[error("Options model not registered: {id}")]
    UnknownModel { id: String },

    /// Option declares a type with no codec while unknown types are rejected
    #[error("No codec registered for type \"{option_type}\" (option \"{key}\")")]
    UnknownOptionType { key: String, option_type: String },

    /// A storage or schema collaborator failed
    #[error("Backend error in model \"{model}\": {message}")]
    Backend { model: String, message: String },

    /// Unrecognised unknown-type policy name
    #[error("Invalid unknown-type policy: {policy}")]
    InvalidPolicy { policy: String },

    /// Engine configuration could not be parsed
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Build a [`Error::Backend`] for the given model.
    pub fn backend(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            model: model.into(),
            message: message.into(),
        }
    }
}
