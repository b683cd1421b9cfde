use std::path::PathBuf;
use std::time::Duration;

use ethers::providers::ProviderError;
use ethers::types::{Address, TxHash};
use reqwest::Url;

use crate::types::{ContractId, StepIndex};

/// Every way a deployment run can fail. All of them are fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("unknown network `{0}`")]
    UnknownNetwork(String),

    #[error("invalid configuration for network `{network}`: {reason}")]
    InvalidNetwork { network: String, reason: String },

    #[error("failed to load private key from {}: {reason}", .path.display())]
    KeyLoad { path: PathBuf, reason: String },

    #[error("network at {url} is unreachable")]
    NetworkUnreachable {
        url: Url,
        #[source]
        source: ProviderError,
    },

    #[error(
        "network `{network}` expects network id {expected} but the node reports {actual}"
    )]
    NetworkIdMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },

    #[error("invalid deployer: {0}")]
    InvalidDeployer(String),

    #[error(
        "step {index} references `{reference}` which is not deployed by an earlier step"
    )]
    UnresolvedReference {
        index: StepIndex,
        reference: ContractId,
    },

    #[error("step {index} deploys `{contract}` which was already deployed")]
    DuplicateContract {
        index: StepIndex,
        contract: ContractId,
    },

    #[error(
        "step {index} is sent from {sender:?} which the signer cannot sign for"
    )]
    UnknownSender { index: StepIndex, sender: Address },

    #[error("step {index} ({description}) failed")]
    StepFailed {
        index: StepIndex,
        description: String,
        #[source]
        cause: StepError,
    },
}

/// Why a single submitted step did not confirm.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("timed out after {0:?} waiting for confirmation")]
    Timeout(Duration),

    #[error("transaction {0:?} reverted")]
    Reverted(TxHash),

    #[error(transparent)]
    Other(#[from] eyre::Report),
}

impl DeployError {
    /// Index of the failing step, for errors raised by the sequencer.
    pub fn step_index(&self) -> Option<StepIndex> {
        match self {
            Self::UnresolvedReference { index, .. }
            | Self::DuplicateContract { index, .. }
            | Self::UnknownSender { index, .. }
            | Self::StepFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}
