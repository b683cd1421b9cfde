use std::collections::HashMap;
use std::path::PathBuf;

use ethers::abi::Abi;
use ethers::providers::{Http, JsonRpcClient};
use ethers::types::{Address, TxHash};
use tokio::sync::Mutex;
use tracing::instrument;

use super::sequencer::{CallRequest, ContractBackend, DeployRequest};
use crate::error::StepError;
use crate::ethers_utils::TransactionBuilder;
use crate::forge_utils::{ContractSpec, ForgeCreate, ForgeInspectAbi};
use crate::network::NetworkProfile;
use crate::signer::SigningProvider;

/// Deploys through `forge create` and calls through the signing provider.
#[derive(Debug)]
pub struct DeploymentContext<P = Http> {
    pub profile: NetworkProfile,
    pub signer: SigningProvider<P>,
    pub contracts_root: PathBuf,
    pub etherscan_api_key: Option<String>,
    abis: Mutex<HashMap<String, Abi>>,
}

impl<P> DeploymentContext<P>
where
    P: JsonRpcClient + 'static,
{
    pub fn new(
        profile: NetworkProfile,
        signer: SigningProvider<P>,
        contracts_root: PathBuf,
        etherscan_api_key: Option<String>,
    ) -> Self {
        Self {
            profile,
            signer,
            contracts_root,
            etherscan_api_key,
            abis: Mutex::new(HashMap::new()),
        }
    }

    pub fn forge_create(
        &self,
        contract_spec: ContractSpec,
        from: Address,
    ) -> ForgeCreate {
        let mut forge_create = ForgeCreate::new(contract_spec)
            .with_cwd(&self.contracts_root)
            .with_sender(self.signer.forge_sender(from))
            .with_rpc_url(&self.profile.rpc_url)
            .with_gas_limit(self.profile.gas_limit);

        if let Some(gas_price) = self.profile.gas_price {
            forge_create = forge_create.with_gas_price(gas_price);
        }

        if let Some(compiler) = self.profile.compiler.as_ref() {
            forge_create = forge_create.with_compiler(compiler.clone());
        }

        if let Some(nonce) = self.signer.next_nonce() {
            forge_create = forge_create.with_override_nonce(nonce);
        }

        if let Some(etherscan_api_key) = self.etherscan_api_key.as_ref() {
            forge_create =
                forge_create.with_verification_api_key(etherscan_api_key);
        }

        forge_create
    }

    /// ABI of `contract_spec`, inspected once per run.
    pub async fn abi(&self, contract_spec: &ContractSpec) -> eyre::Result<Abi> {
        let key = contract_spec.to_string();

        let mut abis = self.abis.lock().await;

        if let Some(abi) = abis.get(&key) {
            return Ok(abi.clone());
        }

        let abi = ForgeInspectAbi::new(contract_spec.clone())
            .with_cwd(&self.contracts_root)
            .run()
            .await?;

        abis.insert(key, abi.clone());

        Ok(abi)
    }
}

impl<P> ContractBackend for DeploymentContext<P>
where
    P: JsonRpcClient + 'static,
{
    fn accounts(&self) -> Vec<Address> {
        self.signer.accounts()
    }

    #[instrument(skip_all, fields(artifact = %request.artifact))]
    async fn deploy(
        &self,
        request: &DeployRequest,
    ) -> Result<Address, StepError> {
        let forge_create = request.args.iter().fold(
            self.forge_create(request.artifact.clone(), request.from),
            |forge_create, arg| forge_create.with_constructor_arg(arg),
        );

        let output = forge_create.run().await?;

        Ok(output.deployed_to)
    }

    #[instrument(skip_all, fields(to = ?request.to, method = %request.method))]
    async fn call(&self, request: &CallRequest) -> Result<TxHash, StepError> {
        let abi = self.abi(&request.artifact).await?;

        let receipt = TransactionBuilder::default()
            .signer(&self.signer)
            .abi(abi)
            .function_name(&request.method)
            .args(request.args.clone())
            .to(request.to)
            .from(request.from)
            .gas_limit(self.profile.gas_limit)
            .gas_price(self.profile.gas_price)
            .build()?
            .send()
            .await?;

        Ok(receipt.transaction_hash)
    }
}
