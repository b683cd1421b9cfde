use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::config::{
    NetworkConfig, NetworkIdSelector, NetworksConfig, SolcSettings,
    DEFAULT_PORT,
};
use crate::error::DeployError;

/// A fully resolved deployment target. Built once at startup and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    pub rpc_url: Url,
    pub network_id: NetworkIdSelector,
    pub gas_limit: u64,
    pub gas_price: Option<u64>,
    pub signer: SignerSource,
    pub compiler: Option<SolcSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerSource {
    Unlocked,
    KeyFile(PathBuf),
}

impl fmt::Display for SignerSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unlocked => write!(f, "unlocked node accounts"),
            Self::KeyFile(path) => write!(f, "key file {}", path.display()),
        }
    }
}

impl NetworkProfile {
    pub fn with_rpc_url(mut self, rpc_url: Url) -> Self {
        self.rpc_url = rpc_url;
        self
    }

    pub fn with_key_file(mut self, key_file: impl AsRef<Path>) -> Self {
        self.signer = SignerSource::KeyFile(key_file.as_ref().to_owned());
        self
    }
}

impl NetworksConfig {
    /// Looks up `name` and validates it into a [`NetworkProfile`].
    ///
    /// Pure configuration lookup, no network I/O.
    pub fn resolve(&self, name: &str) -> Result<NetworkProfile, DeployError> {
        let network = self
            .networks
            .get(name)
            .ok_or_else(|| DeployError::UnknownNetwork(name.to_string()))?;

        let invalid = |reason: String| DeployError::InvalidNetwork {
            network: name.to_string(),
            reason,
        };

        let rpc_url = endpoint(network).map_err(invalid)?;

        let gas_limit = network.gas.value();
        if gas_limit == 0 {
            return Err(invalid("gas limit must be positive".to_string()));
        }

        if network.gas_price == Some(0) {
            return Err(invalid("gas price must be positive".to_string()));
        }

        let signer = match network.key_file.as_ref() {
            Some(key_file) => SignerSource::KeyFile(key_file.clone()),
            None => SignerSource::Unlocked,
        };

        let compiler = network
            .compiler
            .clone()
            .or_else(|| self.compilers.solc.clone());

        Ok(NetworkProfile {
            name: name.to_string(),
            rpc_url,
            network_id: network.network_id,
            gas_limit,
            gas_price: network.gas_price,
            signer,
            compiler,
        })
    }
}

fn endpoint(network: &NetworkConfig) -> Result<Url, String> {
    if let Some(url) = network.url.as_deref() {
        return Url::parse(url)
            .map_err(|err| format!("invalid url {url}: {err}"));
    }

    let host = network
        .host
        .as_deref()
        .filter(|host| !host.trim().is_empty())
        .ok_or_else(|| "either `url` or `host` must be set".to_string())?;

    let port = network.port.unwrap_or(DEFAULT_PORT);

    let url = format!("http://{host}:{port}");

    Url::parse(&url).map_err(|err| format!("invalid endpoint {url}: {err}"))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::config::{GasLimit, MAX_GAS_LIMIT};

    #[test]
    fn resolves_every_builtin_network() -> eyre::Result<()> {
        let config = NetworksConfig::builtin();

        for name in config.networks.keys() {
            let profile = config.resolve(name)?;

            assert_eq!(&profile.name, name);
            assert!(profile.gas_limit > 0);
            assert!(profile.rpc_url.host_str().is_some());
            assert!(profile.compiler.is_some());
        }

        Ok(())
    }

    #[test]
    fn builtin_profiles_match_expected_parameters() -> eyre::Result<()> {
        let config = NetworksConfig::builtin();

        let development = config.resolve("development")?;
        assert_eq!(development.rpc_url.as_str(), "http://localhost:8545/");
        assert_eq!(development.network_id, NetworkIdSelector::Any);
        assert_eq!(development.gas_limit, 7_900_000);
        assert_eq!(development.gas_price, None);
        assert_eq!(development.signer, SignerSource::Unlocked);

        let kovan = config.resolve("kovan")?;
        assert_eq!(kovan.rpc_url.as_str(), "https://kovan.infura.io/");
        assert_eq!(kovan.network_id, NetworkIdSelector::Exact(42));
        assert_eq!(kovan.gas_price, Some(5_000_000_000));
        assert_eq!(
            kovan.signer,
            SignerSource::KeyFile(PathBuf::from("./privKey"))
        );

        let coverage = config.resolve("coverage")?;
        assert_eq!(coverage.gas_limit, MAX_GAS_LIMIT);
        assert_eq!(coverage.gas_price, Some(1));

        Ok(())
    }

    #[test]
    fn unknown_network_is_rejected() {
        let result = NetworksConfig::builtin().resolve("mainnet");

        assert!(matches!(
            result,
            Err(DeployError::UnknownNetwork(name)) if name == "mainnet"
        ));
    }

    #[test]
    fn zero_gas_is_rejected() {
        let mut config = NetworksConfig::builtin();
        config
            .networks
            .get_mut("development")
            .unwrap()
            .gas = GasLimit::Limit(0);

        let result = config.resolve("development");

        assert!(matches!(result, Err(DeployError::InvalidNetwork { .. })));
    }

    #[test]
    fn zero_gas_price_is_rejected() {
        let mut config = NetworksConfig::builtin();
        config.networks.get_mut("kovan").unwrap().gas_price = Some(0);

        let result = config.resolve("kovan");

        assert!(matches!(result, Err(DeployError::InvalidNetwork { .. })));
    }

    #[test]
    fn missing_endpoint_is_rejected() -> eyre::Result<()> {
        let config: NetworksConfig = serde_yaml::from_str(indoc! {r#"
            networks:
              nowhere:
                gas: 100
        "#})?;

        let result = config.resolve("nowhere");

        assert!(matches!(result, Err(DeployError::InvalidNetwork { .. })));

        Ok(())
    }

    #[test]
    fn network_compiler_overrides_global() -> eyre::Result<()> {
        let config: NetworksConfig = serde_yaml::from_str(indoc! {r#"
            networks:
              local:
                host: 127.0.0.1
                port: 7545
                gas: 6000000
                compiler:
                  version: 0.5.0
                  optimizer:
                    enabled: false
                    runs: 1
            compilers:
              solc:
                optimizer:
                  enabled: true
                  runs: 200
        "#})?;

        let profile = config.resolve("local")?;

        assert_eq!(profile.rpc_url.as_str(), "http://127.0.0.1:7545/");
        let compiler = profile.compiler.unwrap();
        assert_eq!(compiler.pinned_version(), Some("0.5.0"));
        assert!(!compiler.optimizer.enabled);

        Ok(())
    }

    #[test]
    fn overrides_produce_new_profile() -> eyre::Result<()> {
        let profile = NetworksConfig::builtin().resolve("development")?;

        let overridden = profile
            .clone()
            .with_rpc_url(Url::parse("http://10.0.0.2:8545")?)
            .with_key_file("./deployer.key");

        assert_eq!(profile.signer, SignerSource::Unlocked);
        assert_eq!(overridden.rpc_url.host_str(), Some("10.0.0.2"));
        assert_eq!(
            overridden.signer,
            SignerSource::KeyFile(PathBuf::from("./deployer.key"))
        );

        Ok(())
    }
}
