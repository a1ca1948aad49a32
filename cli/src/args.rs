use std::path::PathBuf;

use aos_core::ConfigOverrides;
use clap::Parser;

/// Interactive console for a process on the compute gateway.
#[derive(Debug, Parser)]
#[command(name = "aos", version, about)]
pub struct Cli {
    /// Name of the process to connect to; created when it does not exist.
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// JWK wallet to sign with (defaults to ~/.aos.json).
    #[arg(long = "wallet", value_name = "PATH")]
    pub wallet: Option<PathBuf>,

    /// List the processes owned by the wallet and exit.
    #[arg(long = "list")]
    pub list: bool,

    /// Copy the blueprint library into DIR (default: current directory) and exit.
    #[arg(
        long = "get-blueprints",
        value_name = "DIR",
        num_args = 0..=1,
        default_missing_value = "."
    )]
    pub get_blueprints: Option<PathBuf>,

    /// Evaluate FILE before the first prompt. Repeatable.
    #[arg(long = "load", value_name = "FILE")]
    pub load: Vec<PathBuf>,

    /// Read configuration from PATH instead of $AOS_HOME/config.toml.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Gateway base URL.
    #[arg(long = "gateway", value_name = "URL")]
    pub gateway: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            gateway_url: self.gateway.clone(),
            process_name: self.name.clone(),
            wallet: self.wallet.clone(),
            ..ConfigOverrides::default()
        }
    }
}
