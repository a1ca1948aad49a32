use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// No usable wallet could be found or loaded.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("wallet file {} not found", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read wallet {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("wallet {} is not a valid JWK: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("wallet is missing the public modulus `n`")]
    MissingModulus,
    #[error("wallet modulus is not valid base64url: {0}")]
    InvalidModulus(String),
    #[error("could not determine the home directory to look for a wallet")]
    NoHomeDir,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("could not find or create process `{name}`: {source}")]
    Gateway {
        name: String,
        #[source]
        source: EvaluationError,
    },
    #[error("gateway returned no process id for `{name}`")]
    MissingId { name: String },
}

/// A `.load` or `.load-blueprint` directive could not be expanded. The
/// message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of any remote call: evaluation, monitor control, listing or
/// status polling.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timed out after {}s waiting for a result", after.as_secs())]
    Timeout { after: Duration },
    #[error("gateway rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("could not decode gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("could not determine the home directory; set AOS_HOME")]
    NoHomeDir,
}

#[derive(Debug, Error)]
pub enum ReplError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("listing failed: {0}")]
    Listing(#[source] EvaluationError),
    #[error("failed to read input: {0}")]
    Input(String),
}

pub type Result<T, E = ReplError> = std::result::Result<T, E>;
