//! Error types for the port allocator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaldError {
    #[error("Minimum port {min} must not exceed maximum port {max}")]
    InvalidRange { min: u16, max: u16 },

    #[error("Name {0:?} is already taken")]
    NameTaken(String),

    #[error("Port {0} is already taken")]
    PortTaken(u16),

    #[error("Name {name:?} and port {port} are already registered")]
    NameAndPortTaken { name: String, port: u16 },

    #[error("No ports available in range {from}-{to}")]
    NoPortsAvailable { from: u16, to: u16 },

    #[error("Name {0:?} cannot be stored: it must be non-empty, without control characters, '#' or surrounding whitespace")]
    InvalidName(String),

    #[error("Address {0:?} may only contain letters, digits, '_', '.', '-' and ':'")]
    InvalidAddress(String),

    #[error("Name {0:?} not found in the port registry")]
    NotFound(String),

    #[error("Malformed line {line}: {reason} ({content:?})")]
    MalformedLine {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server: {server:?}, port: {port}, status: {status}, error: {message:?}")]
    Server {
        server: String,
        port: u16,
        status: u16,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PaldError {
    /// True for the conflicts a caller can resolve by picking another
    /// name or port, or by releasing one first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            PaldError::NameTaken(_)
                | PaldError::PortTaken(_)
                | PaldError::NameAndPortTaken { .. }
                | PaldError::NoPortsAvailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PaldError>;
