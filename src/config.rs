use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Gas limit used by coverage instrumentation, which inflates bytecode far
/// past what a regular block would accept.
pub const MAX_GAS_LIMIT: u64 = 0xfffffffff;

pub const DEFAULT_PORT: u16 = 8545;

/// The deployment targets, keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworksConfig {
    pub networks: HashMap<String, NetworkConfig>,

    #[serde(default)]
    pub compilers: CompilersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default)]
    pub network_id: NetworkIdSelector,

    pub gas: GasLimit,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,

    /// File holding the hex private key. Networks without one sign with
    /// the node's unlocked accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<SolcSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solc: Option<SolcSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolcSettings {
    /// `native` uses whatever solc is installed locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub optimizer: OptimizerSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            runs: 200,
        }
    }
}

impl SolcSettings {
    /// Explicit compiler version, if one should be requested.
    pub fn pinned_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .filter(|version| *version != "native")
    }
}

/// Which network ids a profile accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NetworkIdSelector {
    #[default]
    Any,
    Exact(u64),
}

impl NetworkIdSelector {
    pub fn matches(&self, network_id: u64) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => *expected == network_id,
        }
    }
}

impl FromStr for NetworkIdSelector {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s == "*" {
            Ok(Self::Any)
        } else {
            Ok(Self::Exact(s.parse()?))
        }
    }
}

impl fmt::Display for NetworkIdSelector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Exact(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

impl Serialize for NetworkIdSelector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NetworkIdSelector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(id) => Ok(Self::Exact(id)),
            NumberOrString::String(s) => {
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Per-transaction gas limit as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasLimit {
    Limit(u64),
    Max,
}

impl GasLimit {
    pub fn value(&self) -> u64 {
        match self {
            Self::Limit(limit) => *limit,
            Self::Max => MAX_GAS_LIMIT,
        }
    }
}

impl FromStr for GasLimit {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("max") {
            Ok(Self::Max)
        } else if let Some(hex) =
            s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
        {
            Ok(Self::Limit(u64::from_str_radix(hex, 16)?))
        } else {
            Ok(Self::Limit(s.parse()?))
        }
    }
}

impl fmt::Display for GasLimit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Limit(limit) => write!(f, "{limit}"),
            Self::Max => write!(f, "max"),
        }
    }
}

impl Serialize for GasLimit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Limit(limit) => serializer.serialize_u64(*limit),
            Self::Max => serializer.serialize_str("max"),
        }
    }
}

impl<'de> Deserialize<'de> for GasLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(limit) => Ok(Self::Limit(limit)),
            NumberOrString::String(s) => {
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Networks available without a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BuiltinNetwork {
    Development,
    Kovan,
    Coverage,
}

impl BuiltinNetwork {
    pub fn config(&self) -> NetworkConfig {
        match self {
            Self::Development => NetworkConfig {
                url: None,
                host: Some("localhost".to_string()),
                port: Some(DEFAULT_PORT),
                network_id: NetworkIdSelector::Any,
                gas: GasLimit::Limit(7_900_000),
                gas_price: None,
                key_file: None,
                compiler: None,
            },
            Self::Kovan => NetworkConfig {
                url: Some("https://kovan.infura.io/".to_string()),
                host: None,
                port: None,
                network_id: NetworkIdSelector::Exact(42),
                gas: GasLimit::Limit(7_900_000),
                gas_price: Some(5_000_000_000),
                key_file: Some(PathBuf::from("./privKey")),
                compiler: None,
            },
            Self::Coverage => NetworkConfig {
                url: None,
                host: Some("localhost".to_string()),
                port: Some(DEFAULT_PORT),
                network_id: NetworkIdSelector::Any,
                gas: GasLimit::Max,
                gas_price: Some(0x01),
                key_file: None,
                compiler: None,
            },
        }
    }
}

impl NetworksConfig {
    pub fn builtin() -> Self {
        let networks = BuiltinNetwork::iter()
            .map(|network| (network.to_string(), network.config()))
            .collect();

        Self {
            networks,
            compilers: CompilersConfig {
                solc: Some(SolcSettings {
                    version: Some("native".to_string()),
                    optimizer: OptimizerSettings {
                        enabled: true,
                        runs: 200,
                    },
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn builtin_networks_are_all_present() {
        let config = NetworksConfig::builtin();

        let mut names: Vec<_> = config.networks.keys().cloned().collect();
        names.sort();

        assert_eq!(names, vec!["coverage", "development", "kovan"]);
        assert_eq!(
            "kovan".parse::<BuiltinNetwork>().ok(),
            Some(BuiltinNetwork::Kovan)
        );
    }

    #[test]
    fn parses_yaml_networks() -> eyre::Result<()> {
        let config: NetworksConfig = serde_yaml::from_str(indoc! {r#"
            networks:
              development:
                host: localhost
                port: 8545
                network_id: "*"
                gas: 7900000
              kovan:
                url: https://kovan.infura.io/
                network_id: "42"
                gas: 7900000
                gas_price: 5000000000
                key_file: ./privKey
              coverage:
                host: localhost
                gas: "0xfffffffff"
                gas_price: 1
              instrumented:
                host: localhost
                network_id: 1337
                gas: max
            compilers:
              solc:
                version: native
                optimizer:
                  enabled: true
                  runs: 200
        "#})?;

        let development = &config.networks["development"];
        assert_eq!(development.network_id, NetworkIdSelector::Any);
        assert_eq!(development.gas, GasLimit::Limit(7_900_000));

        let kovan = &config.networks["kovan"];
        assert_eq!(kovan.network_id, NetworkIdSelector::Exact(42));
        assert_eq!(kovan.key_file, Some(PathBuf::from("./privKey")));

        let coverage = &config.networks["coverage"];
        assert_eq!(coverage.gas.value(), MAX_GAS_LIMIT);
        assert_eq!(coverage.network_id, NetworkIdSelector::Any);

        let instrumented = &config.networks["instrumented"];
        assert_eq!(instrumented.gas, GasLimit::Max);
        assert_eq!(instrumented.network_id, NetworkIdSelector::Exact(1337));

        let solc = config.compilers.solc.as_ref().unwrap();
        assert_eq!(solc.pinned_version(), None);
        assert!(solc.optimizer.enabled);

        Ok(())
    }

    #[test]
    fn rejects_garbage_gas() {
        let result = serde_yaml::from_str::<NetworkConfig>("gas: lots");

        assert!(result.is_err());
    }

    #[test]
    fn network_id_selector_matching() {
        assert!(NetworkIdSelector::Any.matches(5));
        assert!(NetworkIdSelector::Exact(42).matches(42));
        assert!(!NetworkIdSelector::Exact(42).matches(5));
    }

    #[test]
    fn builtin_survives_yaml_round_trip() -> eyre::Result<()> {
        let yaml = serde_yaml::to_string(&NetworksConfig::builtin())?;
        let config: NetworksConfig = serde_yaml::from_str(&yaml)?;

        assert_eq!(config.networks["coverage"].gas, GasLimit::Max);
        assert_eq!(
            config.networks["kovan"].network_id,
            NetworkIdSelector::Exact(42)
        );

        Ok(())
    }
}
