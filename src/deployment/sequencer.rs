use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use ethers::types::{Address, TxHash};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};

use super::plan::{DeploymentStep, StepAction, StepArg};
use crate::error::{DeployError, StepError};
use crate::forge_utils::ContractSpec;
use crate::report::contract_deployment::ContractDeployment;
use crate::types::{ContractId, StepIndex};

pub struct DeployRequest {
    pub artifact: ContractSpec,
    pub args: Vec<String>,
    pub from: Address,
}

pub struct CallRequest {
    pub artifact: ContractSpec,
    pub to: Address,
    pub method: String,
    pub args: Vec<String>,
    pub from: Address,
}

/// Creates contracts and calls their methods on some chain.
///
/// Both operations return only once the transaction is confirmed.
pub trait ContractBackend {
    /// Accounts transactions may be sent from.
    fn accounts(&self) -> Vec<Address>;

    fn deploy(
        &self,
        request: &DeployRequest,
    ) -> impl Future<Output = Result<Address, StepError>>;

    fn call(
        &self,
        request: &CallRequest,
    ) -> impl Future<Output = Result<TxHash, StepError>>;
}

/// Contracts deployed so far, in deployment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub contracts: Vec<ContractDeployment>,
}

impl DeploymentResult {
    pub fn get(&self, name: &ContractId) -> Option<&ContractDeployment> {
        self.contracts.iter().find(|contract| &contract.name == name)
    }

    pub fn address_of(&self, name: &ContractId) -> Option<Address> {
        self.get(name).map(|contract| contract.address)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    fn record(&mut self, deployment: ContractDeployment) {
        self.contracts.push(deployment);
    }
}

/// Runs deployment steps one at a time, each only after the previous one
/// is confirmed.
pub struct Sequencer<'a, B> {
    backend: &'a B,
    default_sender: Address,
    confirmation_timeout: Option<Duration>,
}

impl<'a, B> Sequencer<'a, B>
where
    B: ContractBackend,
{
    pub fn new(backend: &'a B, default_sender: Address) -> Self {
        Self {
            backend,
            default_sender,
            confirmation_timeout: None,
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = Some(timeout);
        self
    }

    /// Checks ordering, uniqueness and senders without contacting the
    /// backend beyond asking for its accounts.
    pub fn validate(
        &self,
        steps: &[DeploymentStep],
    ) -> Result<(), DeployError> {
        validate_order(steps)?;

        let accounts = self.backend.accounts();

        for (index, step) in indexed(steps) {
            let sender = step.from.unwrap_or(self.default_sender);
            if !accounts.contains(&sender) {
                return Err(DeployError::UnknownSender { index, sender });
            }
        }

        Ok(())
    }

    pub async fn run(
        &self,
        steps: &[DeploymentStep],
    ) -> Result<DeploymentResult, DeployError> {
        self.validate(steps)?;

        let mut result = DeploymentResult::default();

        for (index, step) in indexed(steps) {
            let span = info_span!("step", %index, %step);

            let outcome = self
                .execute(index, step, &result)
                .instrument(span)
                .await;

            match outcome {
                Ok(Some(deployment)) => result.record(deployment),
                Ok(None) => {}
                Err(err) => {
                    if result.is_empty() {
                        warn!("Nothing was deployed before the failure");
                    }

                    for contract in &result.contracts {
                        warn!(
                            name = %contract.name,
                            address = ?contract.address,
                            "Deployed before the failure"
                        );
                    }

                    return Err(err);
                }
            }
        }

        info!(contracts = result.len(), "Deployment complete");

        Ok(result)
    }

    async fn execute(
        &self,
        index: StepIndex,
        step: &DeploymentStep,
        result: &DeploymentResult,
    ) -> Result<Option<ContractDeployment>, DeployError> {
        let from = step.from.unwrap_or(self.default_sender);

        let args = step
            .args()
            .iter()
            .map(|arg| render_arg(index, arg, result))
            .collect::<Result<Vec<_>, _>>()?;

        let failed = |cause| DeployError::StepFailed {
            index,
            description: step.to_string(),
            cause,
        };

        match &step.action {
            StepAction::Deploy {
                contract, artifact, ..
            } => {
                let artifact = ContractSpec::parse(artifact);
                let request = DeployRequest {
                    artifact: artifact.clone(),
                    args,
                    from,
                };

                let address = self
                    .confirm(self.backend.deploy(&request))
                    .await
                    .map_err(failed)?;

                info!(?address, "Deployed {contract}");

                Ok(Some(ContractDeployment {
                    name: contract.clone(),
                    artifact: artifact.to_string(),
                    address,
                }))
            }
            StepAction::Call { target, method, .. } => {
                let deployment = result.get(target).ok_or_else(|| {
                    DeployError::UnresolvedReference {
                        index,
                        reference: target.clone(),
                    }
                })?;

                let request = CallRequest {
                    artifact: ContractSpec::parse(&deployment.artifact),
                    to: deployment.address,
                    method: method.clone(),
                    args,
                    from,
                };

                let tx_hash = self
                    .confirm(self.backend.call(&request))
                    .await
                    .map_err(failed)?;

                info!(?tx_hash, "Called {target}.{method}");

                Ok(None)
            }
        }
    }

    async fn confirm<T>(
        &self,
        fut: impl Future<Output = Result<T, StepError>>,
    ) -> Result<T, StepError> {
        match self.confirmation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| StepError::Timeout(timeout))?,
            None => fut.await,
        }
    }
}

/// Every reference must point at a contract deployed by an earlier step,
/// and every contract id may be deployed only once.
pub fn validate_order(steps: &[DeploymentStep]) -> Result<(), DeployError> {
    let mut deployed = HashSet::new();

    for (index, step) in indexed(steps) {
        if let Some(reference) =
            step.references().find(|id| !deployed.contains(*id))
        {
            return Err(DeployError::UnresolvedReference {
                index,
                reference: reference.clone(),
            });
        }

        if let StepAction::Deploy { contract, .. } = &step.action {
            if !deployed.insert(contract) {
                return Err(DeployError::DuplicateContract {
                    index,
                    contract: contract.clone(),
                });
            }
        }
    }

    Ok(())
}

fn indexed(
    steps: &[DeploymentStep],
) -> impl Iterator<Item = (StepIndex, &DeploymentStep)> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| (StepIndex(i + 1), step))
}

fn render_arg(
    index: StepIndex,
    arg: &StepArg,
    result: &DeploymentResult,
) -> Result<String, DeployError> {
    match arg {
        StepArg::AddressOf { address_of } => result
            .address_of(address_of)
            .map(|address| format!("{address:?}"))
            .ok_or_else(|| DeployError::UnresolvedReference {
                index,
                reference: address_of.clone(),
            }),
        StepArg::Bool(value) => Ok(value.to_string()),
        StepArg::Integer(value) => Ok(value.to_string()),
        StepArg::Text(value) => Ok(value.clone()),
    }
}
