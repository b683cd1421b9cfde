use std::path::PathBuf;

use clap::Parser;
use reqwest::Url;

pub mod private_key;

pub use private_key::PrivateKey;

use crate::signer::DeployerSelector;

#[derive(Debug, Clone, Parser)]
#[clap(rename_all = "kebab-case", version, about)]
pub struct Args {
    /// Name of the network profile to deploy to
    #[clap(short, long, env, default_value = "development")]
    pub network: String,

    /// Path to a networks configuration file (YAML or TOML)
    ///
    /// When omitted the built-in development, kovan and coverage profiles
    /// are used
    #[clap(long, env)]
    pub networks: Option<PathBuf>,

    /// Path to a deployment plan file (YAML or TOML)
    ///
    /// When omitted the built-in token exchange plan is deployed
    #[clap(short, long, env)]
    pub plan: Option<PathBuf>,

    /// The name of the deployment, used as the report directory
    ///
    /// Defaults to the network name
    #[clap(short, long, env)]
    pub deployment_name: Option<String>,

    /// Overrides the RPC url of the selected network
    #[clap(short, long, env)]
    pub rpc_url: Option<Url>,

    /// Overrides the private key file of the selected network
    #[clap(short, long, env)]
    pub key_file: Option<PathBuf>,

    /// Account that owns the deployment, as an index into the signer's
    /// accounts or as an address
    #[clap(long, env, default_value = "0")]
    pub deployer: DeployerSelector,

    /// Root of the forge project holding the contracts
    #[clap(long, env, default_value = ".")]
    pub contracts_root: PathBuf,

    /// Seconds to wait for each step to confirm before giving up
    #[clap(long, env)]
    pub confirmation_timeout: Option<u64>,

    /// The etherscan API key to use for contract verification
    #[clap(short, long, env)]
    pub etherscan_api_key: Option<String>,

    /// Skip the confirmation prompt
    #[clap(short, long)]
    pub yes: bool,

    /// Resolve the network and validate the plan without sending anything
    #[clap(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_to_development() -> eyre::Result<()> {
        let args = Args::try_parse_from(["deployer"])?;

        assert_eq!(args.network, "development");
        assert_eq!(args.deployer, DeployerSelector::Index(0));
        assert_eq!(args.contracts_root, PathBuf::from("."));
        assert!(!args.dry_run);

        Ok(())
    }

    #[test]
    fn parses_overrides() -> eyre::Result<()> {
        let args = Args::try_parse_from([
            "deployer",
            "--network",
            "kovan",
            "--rpc-url",
            "https://kovan.example.org",
            "--key-file",
            "./secrets/kovan.key",
            "--deployer",
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "--confirmation-timeout",
            "120",
            "--yes",
        ])?;

        assert_eq!(args.network, "kovan");
        assert_eq!(
            args.rpc_url.as_ref().and_then(|url| url.host_str()),
            Some("kovan.example.org")
        );
        assert_eq!(args.key_file, Some(PathBuf::from("./secrets/kovan.key")));
        assert!(matches!(args.deployer, DeployerSelector::Address(_)));
        assert_eq!(args.confirmation_timeout, Some(120));
        assert!(args.yes);

        Ok(())
    }
}
