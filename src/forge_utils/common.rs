use std::fmt;
use std::path::PathBuf;

use ethers::types::Address;

use crate::cli::PrivateKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub path: Option<PathBuf>,
    pub name: String,
}

impl ContractSpec {
    pub fn path_name(path: PathBuf, name: impl ToString) -> Self {
        Self {
            path: Some(path),
            name: name.to_string(),
        }
    }

    pub fn name(name: impl ToString) -> Self {
        Self {
            path: None,
            name: name.to_string(),
        }
    }

    /// Accepts either `Name` or `path/to/File.sol:Name`.
    pub fn parse(s: &str) -> Self {
        match s.rsplit_once(':') {
            Some((path, name)) => Self::path_name(PathBuf::from(path), name),
            None => Self::name(s),
        }
    }
}

impl fmt::Display for ContractSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = self.path.as_deref() {
            write!(f, "{}:{}", path.display(), self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// How `forge` authorizes the transactions it broadcasts.
#[derive(Debug, Clone)]
pub enum ForgeSender {
    PrivateKey(PrivateKey),
    /// `eth_sendTransaction` from an account the node has unlocked
    Unlocked(Address),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_qualified_names() {
        assert_eq!(ContractSpec::parse("Token"), ContractSpec::name("Token"));

        let qualified = ContractSpec::parse("contracts/Exchange.sol:Exchange");
        assert_eq!(
            qualified,
            ContractSpec::path_name(
                PathBuf::from("contracts/Exchange.sol"),
                "Exchange"
            )
        );
        assert_eq!(qualified.to_string(), "contracts/Exchange.sol:Exchange");
    }
}
