use std::path::{Path, PathBuf};

use ethers::abi::Abi;
use eyre::Context;
use tracing::instrument;

use super::common::ContractSpec;

pub struct ForgeInspectAbi {
    cwd: Option<PathBuf>,
    contract_spec: ContractSpec,
}

impl ForgeInspectAbi {
    pub fn new(contract_spec: ContractSpec) -> Self {
        Self {
            cwd: None,
            contract_spec,
        }
    }

    pub fn with_cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_owned());
        self
    }

    pub fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("forge");

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.arg("inspect");
        cmd.arg(self.contract_spec.to_string());
        cmd.args(["abi", "--json"]);

        cmd
    }

    #[instrument(
        name = "forge_inspect_abi",
        skip_all,
        fields(contract = %self.contract_spec)
    )]
    pub async fn run(&self) -> eyre::Result<Abi> {
        let output = self.command().output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            eyre::bail!("forge inspect failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);

        serde_json::from_str(&stdout)
            .with_context(|| format!("Parsing ABI of {}", self.contract_spec))
    }
}
