use std::path::{Path, PathBuf};

use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::common::{ContractSpec, ForgeSender};
use crate::config::SolcSettings;

#[derive(Debug)]
pub struct ForgeCreate {
    cwd: Option<PathBuf>,
    contract_spec: ContractSpec,
    sender: Option<ForgeSender>,
    rpc_url: Option<String>,
    override_nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<u64>,
    compiler: Option<SolcSettings>,
    constructor_args: Vec<String>,
    verification_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeOutput {
    pub deployer: Address,
    pub deployed_to: Address,
    pub transaction_hash: H256,
}

impl ForgeCreate {
    pub fn new(contract_spec: ContractSpec) -> Self {
        Self {
            cwd: None,
            contract_spec,
            sender: None,
            rpc_url: None,
            override_nonce: None,
            gas_limit: None,
            gas_price: None,
            compiler: None,
            constructor_args: vec![],
            verification_api_key: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_owned());
        self
    }

    pub fn with_sender(mut self, sender: ForgeSender) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: impl ToString) -> Self {
        self.rpc_url = Some(rpc_url.to_string());
        self
    }

    pub fn with_override_nonce(mut self, override_nonce: u64) -> Self {
        self.override_nonce = Some(override_nonce);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Setting a gas price switches to legacy transactions.
    pub fn with_gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_compiler(mut self, compiler: SolcSettings) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn with_constructor_arg(mut self, arg: impl ToString) -> Self {
        self.constructor_args.push(arg.to_string());
        self
    }

    pub fn with_verification_api_key(
        mut self,
        verification_api_key: impl ToString,
    ) -> Self {
        self.verification_api_key = Some(verification_api_key.to_string());
        self
    }

    pub fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("forge");
        cmd.arg("create");

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.arg(self.contract_spec.to_string());

        match &self.sender {
            Some(ForgeSender::PrivateKey(private_key)) => {
                cmd.arg("--private-key");
                cmd.arg(format!("{private_key:#}"));
            }
            Some(ForgeSender::Unlocked(from)) => {
                cmd.arg("--unlocked");
                cmd.arg("--from");
                cmd.arg(format!("{from:?}"));
            }
            None => {}
        }

        if let Some(rpc_url) = &self.rpc_url {
            cmd.arg("--rpc-url");
            cmd.arg(rpc_url);
        }

        if let Some(nonce) = self.override_nonce {
            cmd.arg("--nonce");
            cmd.arg(nonce.to_string());
        }

        if let Some(gas_limit) = self.gas_limit {
            cmd.arg("--gas-limit");
            cmd.arg(gas_limit.to_string());
        }

        if let Some(gas_price) = self.gas_price {
            cmd.arg("--gas-price");
            cmd.arg(gas_price.to_string());
            cmd.arg("--legacy");
        }

        if let Some(compiler) = &self.compiler {
            if compiler.optimizer.enabled {
                cmd.arg("--optimize");
                cmd.arg("--optimizer-runs");
                cmd.arg(compiler.optimizer.runs.to_string());
            }

            if let Some(version) = compiler.pinned_version() {
                cmd.arg("--use");
                cmd.arg(version);
            }
        }

        if let Some(verification_api_key) = &self.verification_api_key {
            cmd.arg("--etherscan-api-key");
            cmd.arg(verification_api_key);
            cmd.arg("--verify");
        }

        cmd.arg("--broadcast");
        cmd.arg("--json");

        for constructor_arg in &self.constructor_args {
            cmd.arg("--constructor-args");
            cmd.arg(constructor_arg);
        }

        cmd
    }

    #[instrument(
        name = "forge_create",
        skip_all,
        fields(contract = %self.contract_spec)
    )]
    pub async fn run(&self) -> eyre::Result<ForgeOutput> {
        let mut cmd = self.command();

        info!(
            nonce = ?self.override_nonce,
            args = ?self.constructor_args,
            "Creating contract"
        );

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            eyre::bail!("forge create failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let s = strip_non_json(&stdout);

        let output: ForgeOutput = serde_json::from_str(s)?;

        info!(
            deployer = ?output.deployer,
            deployed_to = ?output.deployed_to,
            tx_hash = ?output.transaction_hash,
            "Contract created"
        );

        Ok(output)
    }
}

/// The JSON document is the last line opening with `{`; anything before it
/// is compiler output.
fn strip_non_json(s: &str) -> &str {
    let s = s
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .unwrap_or(s);

    let Some(start) = s.find('{') else {
        return s;
    };

    match s[start..].rfind('}') {
        Some(end) => &s[start..=start + end],
        None => s,
    }
}
