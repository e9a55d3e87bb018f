//! Error types shared by the store, the file store and the service.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No recipient exists with the requested identifier.
    #[error("recipient not found")]
    NotFound,

    /// The donation amount could not be read as an integer.
    #[error("invalid donation amount: {0}")]
    InvalidAmount(String),

    /// The identifier is not a valid object id.
    #[error("invalid recipient id '{id}': {source}")]
    InvalidId {
        id: String,
        #[source]
        source: bson::oid::Error,
    },

    /// A form value could not be coerced to the field's type.
    #[error("cast to {field} failed for value '{value}'")]
    Cast { field: &'static str, value: String },

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// The store never obtained a usable client at startup.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("multipart error: {0}")]
    Multipart(String),

    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    #[error("invalid configuration: {message}")]
    ConfigValidation { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<actix_multipart::MultipartError> for Error {
    fn from(err: actix_multipart::MultipartError) -> Self {
        Self::Multipart(err.to_string())
    }
}

impl Error {
    #[must_use]
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount(message.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
