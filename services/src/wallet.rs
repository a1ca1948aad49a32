use std::path::PathBuf;

use aos_core::Credential;
use aos_core::CredentialError;
use aos_core::capability::CredentialProvider;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::Digest;
use sha2::Sha256;
use tracing::debug;

use crate::loader::expand_home;

/// Wallet looked up in the user's home directory when none is given.
pub const DEFAULT_WALLET_FILE: &str = ".aos.json";

/// Loads a JWK wallet from disk.
#[derive(Debug, Clone, Default)]
pub struct WalletProvider {
    path: Option<PathBuf>,
}

impl WalletProvider {
    /// `path` is the `--wallet` argument, if any. A leading `~` is expanded.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn resolve_path(&self) -> Result<PathBuf, CredentialError> {
        match &self.path {
            Some(path) => Ok(expand_home(&path.to_string_lossy())),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_WALLET_FILE))
                .ok_or(CredentialError::NoHomeDir),
        }
    }

    pub fn load(&self) -> Result<Credential, CredentialError> {
        let path = self.resolve_path()?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::NotFound { path });
            }
            Err(source) => return Err(CredentialError::Read { path, source }),
        };
        let jwk: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|source| CredentialError::Parse {
                path: path.clone(),
                source,
            })?;
        let owner = owner_address(&jwk)?;
        debug!(path = %path.display(), owner = %owner, "wallet parsed");
        Ok(Credential::new(jwk, owner))
    }
}

#[async_trait]
impl CredentialProvider for WalletProvider {
    async fn acquire(&self) -> Result<Credential, CredentialError> {
        self.load()
    }
}

/// `base64url(sha256(n))`, where `n` is the RSA modulus of the key.
pub fn owner_address(jwk: &serde_json::Value) -> Result<String, CredentialError> {
    let modulus = jwk
        .get("n")
        .and_then(serde_json::Value::as_str)
        .ok_or(CredentialError::MissingModulus)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(modulus.trim_end_matches('='))
        .map_err(|err| CredentialError::InvalidModulus(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(&bytes)))
}
