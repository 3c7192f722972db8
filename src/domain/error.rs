use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("heading level `{level}` is outside h1..h6")]
    InvalidLevel { level: u8 },
    #[error("navigation entry `{id}` not found")]
    UnknownEntry { id: String },
}

impl DomainError {
    pub fn unknown_entry(id: impl Into<String>) -> Self {
        Self::UnknownEntry { id: id.into() }
    }
}
