use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ethers::prelude::SignerMiddleware;
use ethers::providers::{
    Http, JsonRpcClient, Middleware, Provider, ProviderError,
};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, TransactionReceipt};
use eyre::{Context, ContextCompat};
use tracing::{info, instrument, warn};

use crate::cli::PrivateKey;
use crate::config::NetworkIdSelector;
use crate::error::DeployError;
use crate::forge_utils::ForgeSender;
use crate::network::{NetworkProfile, SignerSource};

pub mod nonce;

pub use self::nonce::NonceTracker;

pub type WalletClient<P = Http> = SignerMiddleware<Provider<P>, LocalWallet>;

/// Which account owns the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum DeployerSelector {
    #[display(fmt = "account #{}", _0)]
    Index(usize),
    #[display(fmt = "{:?}", _0)]
    Address(Address),
}

impl FromStr for DeployerSelector {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.starts_with("0x") {
            let address = s
                .parse()
                .map_err(|err| eyre::eyre!("invalid address {s}: {err}"))?;

            Ok(Self::Address(address))
        } else {
            Ok(Self::Index(s.parse()?))
        }
    }
}

impl DeployerSelector {
    pub fn select(&self, accounts: &[Address]) -> Result<Address, DeployError> {
        match self {
            Self::Index(index) => {
                accounts.get(*index).copied().ok_or_else(|| {
                    DeployError::InvalidDeployer(format!(
                        "account #{index} requested but the signer has {} account(s)",
                        accounts.len()
                    ))
                })
            }
            Self::Address(address) => {
                if accounts.contains(address) {
                    Ok(*address)
                } else {
                    Err(DeployError::InvalidDeployer(format!(
                        "{address:?} is not an account the signer controls"
                    )))
                }
            }
        }
    }
}

/// Authorizes and submits the transactions of a single run.
///
/// Owns the HTTP transport, which is released when the provider is dropped.
#[derive(Debug)]
pub struct SigningProvider<P = Http> {
    pub chain_id: u64,
    pub deployer: Address,
    backend: SignerBackend<P>,
}

#[derive(Debug)]
enum SignerBackend<P> {
    Unlocked {
        provider: Arc<Provider<P>>,
        accounts: Vec<Address>,
    },
    Wallet {
        client: Arc<WalletClient<P>>,
        private_key: PrivateKey,
        nonces: NonceTracker,
    },
}

impl<P> SigningProvider<P>
where
    P: JsonRpcClient + 'static,
{
    /// Accounts this provider can sign for.
    pub fn accounts(&self) -> Vec<Address> {
        match &self.backend {
            SignerBackend::Unlocked { accounts, .. } => accounts.clone(),
            SignerBackend::Wallet { client, .. } => vec![client.address()],
        }
    }

    /// The nonce to attach to the next transaction, if this provider tracks
    /// nonces itself.
    pub fn next_nonce(&self) -> Option<u64> {
        match &self.backend {
            SignerBackend::Unlocked { .. } => None,
            SignerBackend::Wallet { nonces, .. } => Some(nonces.next_nonce()),
        }
    }

    pub fn forge_sender(&self, from: Address) -> ForgeSender {
        match &self.backend {
            SignerBackend::Unlocked { .. } => ForgeSender::Unlocked(from),
            SignerBackend::Wallet { private_key, .. } => {
                ForgeSender::PrivateKey(private_key.clone())
            }
        }
    }

    pub fn is_wallet(&self) -> bool {
        matches!(self.backend, SignerBackend::Wallet { .. })
    }

    /// Fills, signs and submits `tx`, then waits for it to be mined.
    pub async fn send_transaction(
        &self,
        tx: TypedTransaction,
    ) -> eyre::Result<TransactionReceipt> {
        match &self.backend {
            SignerBackend::Unlocked { provider, .. } => {
                submit(provider.as_ref(), tx).await
            }
            SignerBackend::Wallet { client, .. } => {
                submit(client.as_ref(), tx).await
            }
        }
    }
}

async fn submit<M>(
    client: &M,
    mut tx: TypedTransaction,
) -> eyre::Result<TransactionReceipt>
where
    M: Middleware,
    M::Error: 'static,
{
    client
        .fill_transaction(&mut tx, None)
        .await
        .context("Filling transaction")?;

    let pending = client
        .send_transaction(tx, None)
        .await
        .context("Send transaction")?;

    let receipt = pending
        .await
        .context("Awaiting receipt")?
        .context("Transaction dropped before being mined")?;

    Ok(receipt)
}

/// Reads a raw hex private key from `path`.
///
/// Failures are fatal; the file is never retried.
pub async fn load_key_file(path: &Path) -> Result<PrivateKey, DeployError> {
    let key_load = |reason: String| DeployError::KeyLoad {
        path: path.to_owned(),
        reason,
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| key_load(err.to_string()))?;

    if content.trim().is_empty() {
        return Err(key_load("file is empty".to_string()));
    }

    content
        .parse()
        .map_err(|err: eyre::Error| key_load(format!("malformed key: {err}")))
}

#[instrument(
    name = "signing_provider",
    skip_all,
    fields(network = %profile.name)
)]
pub async fn create_provider(
    profile: &NetworkProfile,
    deployer: &DeployerSelector,
) -> Result<SigningProvider, DeployError> {
    // Load the key before touching the network so a bad key fails fast
    let private_key = match &profile.signer {
        SignerSource::KeyFile(path) => Some(load_key_file(path).await?),
        SignerSource::Unlocked => None,
    };

    let provider = Provider::new(Http::new(profile.rpc_url.clone()));

    connect(profile, provider, private_key, deployer).await
}

/// Checks the node behind `provider` against `profile` and sets up signing
/// for the selected deployer.
pub async fn connect<P>(
    profile: &NetworkProfile,
    provider: Provider<P>,
    private_key: Option<PrivateKey>,
    deployer: &DeployerSelector,
) -> Result<SigningProvider<P>, DeployError>
where
    P: JsonRpcClient + 'static,
{
    let unreachable = |source: ProviderError| DeployError::NetworkUnreachable {
        url: profile.rpc_url.clone(),
        source,
    };

    let chain_id = provider.get_chainid().await.map_err(unreachable)?.as_u64();

    if let NetworkIdSelector::Exact(expected) = profile.network_id {
        let net_version =
            provider.get_net_version().await.map_err(unreachable)?;

        let actual: u64 = net_version.trim().parse().map_err(|_| {
            DeployError::InvalidNetwork {
                network: profile.name.clone(),
                reason: format!("node reported network id {net_version:?}"),
            }
        })?;

        if !profile.network_id.matches(actual) {
            return Err(DeployError::NetworkIdMismatch {
                network: profile.name.clone(),
                expected,
                actual,
            });
        }
    }

    let Some(private_key) = private_key else {
        let accounts = provider.get_accounts().await.map_err(unreachable)?;

        if accounts.is_empty() {
            return Err(DeployError::InvalidDeployer(
                "the node exposes no unlocked accounts".to_string(),
            ));
        }

        let deployer = deployer.select(&accounts)?;

        if deployer != accounts[0] {
            warn!(?deployer, "Deploying from a non-default unlocked account");
        }

        info!(
            ?deployer,
            chain_id,
            accounts = accounts.len(),
            "Unlocked accounts ready"
        );

        return Ok(SigningProvider {
            chain_id,
            deployer,
            backend: SignerBackend::Unlocked {
                provider: Arc::new(provider),
                accounts,
            },
        });
    };

    let wallet = private_key.wallet().with_chain_id(chain_id);
    let address = wallet.address();

    let deployer = deployer.select(&[address])?;

    let nonce = provider
        .get_transaction_count(address, Some(BlockNumber::Pending.into()))
        .await
        .map_err(unreachable)?
        .as_u64();

    info!(?address, chain_id, nonce, "Wallet ready");

    Ok(SigningProvider {
        chain_id,
        deployer,
        backend: SignerBackend::Wallet {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            private_key,
            nonces: NonceTracker::new(nonce),
        },
    })
}
