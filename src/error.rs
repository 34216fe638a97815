use thiserror::Error;

use crate::model::ErrorKind;
use crate::xml::XmlError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Xml Error: {0}")]
    Xml(#[from] XmlError),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The list endpoint returned no entries: {0}")]
    EmptyList(String),

    #[error("Store rejected {location} with status {status}")]
    StoreRejected { location: String, status: u16 },
}

/// Everything that can go wrong while fetching a single deputy's detail page.
/// Each variant maps onto exactly one [`ErrorKind`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Element '{0}' not found")]
    MissingElement(&'static str),

    #[error("Parse error: {0}")]
    Xml(#[from] XmlError),

    #[error("URL Error: {0}")]
    Transport(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Status(_) => ErrorKind::HttpError,
            FetchError::EmptyResponse => ErrorKind::EmptyResponse,
            FetchError::MissingElement(_) => ErrorKind::ParseError,
            FetchError::Xml(_) => ErrorKind::XmlParseError,
            FetchError::Transport(_) => ErrorKind::UrlError,
            FetchError::Unexpected(_) => ErrorKind::UnexpectedError,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        FetchError::Transport(value.to_string())
    }
}
