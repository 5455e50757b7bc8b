use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildLensError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Received {status} when trying to access {url}")]
    Api {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unable to parse response: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BuildLensError>;
