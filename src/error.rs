use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CooldownError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, CooldownError>;
