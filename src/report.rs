use std::path::{Path, PathBuf};

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::deployment::sequencer::DeploymentResult;
use crate::serde_utils;

pub mod contract_deployment;

pub use self::contract_deployment::ContractDeployment;

pub const REPORT_PATH: &str = "report.yml";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub network: String,
    pub chain_id: u64,
    pub plan: String,
    pub deployer: Address,

    #[serde(default)]
    pub contracts: Vec<ContractDeployment>,
}

impl Report {
    pub fn new(
        network: impl ToString,
        chain_id: u64,
        plan: impl ToString,
        deployer: Address,
        result: DeploymentResult,
    ) -> Self {
        Self {
            network: network.to_string(),
            chain_id,
            plan: plan.to_string(),
            deployer,
            contracts: result.contracts,
        }
    }

    /// The address table shown to the operator once a run completes.
    pub fn summary(&self) -> String {
        let width = self
            .contracts
            .iter()
            .map(|contract| contract.name.len())
            .max()
            .unwrap_or(0);

        let mut lines = vec![
            "Smart contract addresses".to_string(),
            "---------------------------------".to_string(),
        ];

        lines.extend(self.contracts.iter().map(|contract| {
            let name = format!("{}:", contract.name);
            format!("{name:<pad$}{:?}", contract.address, pad = width + 3)
        }));

        lines.join("\n")
    }

    pub fn path(deployment_dir: impl AsRef<Path>) -> PathBuf {
        deployment_dir.as_ref().join(REPORT_PATH)
    }

    #[instrument(skip_all)]
    pub async fn write(
        &self,
        deployment_dir: impl AsRef<Path>,
    ) -> eyre::Result<PathBuf> {
        let deployment_dir = deployment_dir.as_ref();

        tokio::fs::create_dir_all(deployment_dir).await?;

        let path = Self::path(deployment_dir);
        serde_utils::write_serialize(&path, self).await?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn report() -> Report {
        let contracts = vec![
            ContractDeployment {
                name: "ACMEToken".into(),
                artifact: "Token".to_string(),
                address: Address::from_low_u64_be(1),
            },
            ContractDeployment {
                name: "UmbrellaToken".into(),
                artifact: "Token".to_string(),
                address: Address::from_low_u64_be(2),
            },
            ContractDeployment {
                name: "Exchange".into(),
                artifact: "Exchange".to_string(),
                address: Address::from_low_u64_be(3),
            },
        ];

        Report::new(
            "development",
            1337,
            "token-exchange",
            Address::from_low_u64_be(0xa11ce),
            DeploymentResult { contracts },
        )
    }

    #[test]
    fn summary_lists_every_contract() {
        assert_eq!(
            report().summary(),
            indoc! {"
                Smart contract addresses
                ---------------------------------
                ACMEToken:      0x0000000000000000000000000000000000000001
                UmbrellaToken:  0x0000000000000000000000000000000000000002
                Exchange:       0x0000000000000000000000000000000000000003"}
        );
    }

    #[test]
    fn empty_summary_has_only_the_header() {
        let report = Report::new(
            "development",
            1337,
            "token-exchange",
            Address::zero(),
            DeploymentResult::default(),
        );

        assert_eq!(
            report.summary(),
            "Smart contract addresses\n---------------------------------"
        );
    }

    #[tokio::test]
    async fn writes_and_reads_back() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let deployment_dir = dir.path().join("development");

        let report = report();
        let path = report.write(&deployment_dir).await?;

        assert_eq!(path, deployment_dir.join(REPORT_PATH));

        let read: Report = serde_utils::read_deserialize(&path).await?;
        assert_eq!(read, report);

        Ok(())
    }
}
