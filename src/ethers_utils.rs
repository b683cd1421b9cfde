use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{Abi, Function, Token};
use ethers::providers::{Http, JsonRpcClient};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Bytes, Eip1559TransactionRequest, TransactionReceipt,
    TransactionRequest,
};
use eyre::{bail, Context, ContextCompat};

use crate::error::StepError;
use crate::signer::SigningProvider;

pub struct Transaction<'a, P = Http> {
    signer: &'a SigningProvider<P>,
    abi: Abi,
    function_name: String,
    args: Vec<String>,
    to: Address,
    from: Address,
    gas_limit: u64,
    gas_price: Option<u64>,
}

pub struct TransactionBuilder<'a, P = Http> {
    signer: Option<&'a SigningProvider<P>>,
    abi: Option<Abi>,
    function_name: Option<String>,
    args: Option<Vec<String>>,
    to: Option<Address>,
    from: Option<Address>,
    gas_limit: Option<u64>,
    gas_price: Option<u64>,
}

impl<'a, P> Default for TransactionBuilder<'a, P> {
    fn default() -> Self {
        Self {
            signer: None,
            abi: None,
            function_name: None,
            args: None,
            to: None,
            from: None,
            gas_limit: None,
            gas_price: None,
        }
    }
}

impl<'a, P> TransactionBuilder<'a, P> {
    pub fn signer(mut self, signer: &'a SigningProvider<P>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn abi(mut self, abi: Abi) -> Self {
        self.abi = Some(abi);
        self
    }

    pub fn function_name(mut self, function_name: impl ToString) -> Self {
        self.function_name = Some(function_name.to_string());
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn gas_price(mut self, gas_price: Option<u64>) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn build(self) -> eyre::Result<Transaction<'a, P>> {
        Ok(Transaction {
            signer: self.signer.context("TransactionBuilder missing signer")?,
            abi: self.abi.context("TransactionBuilder missing abi")?,
            function_name: self
                .function_name
                .context("TransactionBuilder missing function_name")?,
            args: self.args.unwrap_or_default(),
            to: self.to.context("TransactionBuilder missing to")?,
            from: self.from.context("TransactionBuilder missing from")?,
            gas_limit: self
                .gas_limit
                .context("TransactionBuilder missing gas_limit")?,
            gas_price: self.gas_price,
        })
    }
}

impl<'a, P> Transaction<'a, P>
where
    P: JsonRpcClient + 'static,
{
    /// Submits the call and waits for its receipt.
    pub async fn send(self) -> Result<TransactionReceipt, StepError> {
        let func = self.abi.function(&self.function_name).with_context(|| {
            format!("ABI has no function `{}`", self.function_name)
        })?;

        let tokens = tokenize_args(func, &self.args)?;

        let call_data = func
            .encode_input(&tokens)
            .with_context(|| {
                format!("Encoding call to `{}`", func.signature())
            })?;

        let tx = build_transaction(
            Some(self.to),
            self.from,
            call_data.into(),
            self.gas_limit,
            self.gas_price,
            self.signer.next_nonce(),
        );

        let receipt = self.signer.send_transaction(tx).await?;

        ensure_success(receipt)
    }
}

/// Anything but status `1` means the transaction was mined but reverted.
pub fn ensure_success(
    receipt: TransactionReceipt,
) -> Result<TransactionReceipt, StepError> {
    if receipt.status != Some(1.into()) {
        return Err(StepError::Reverted(receipt.transaction_hash));
    }

    Ok(receipt)
}

/// Parses textual arguments against the parameter types of `func`.
pub fn tokenize_args(
    func: &Function,
    args: &[String],
) -> eyre::Result<Vec<Token>> {
    if func.inputs.len() != args.len() {
        bail!(
            "`{}` takes {} argument(s) but {} were given",
            func.signature(),
            func.inputs.len(),
            args.len()
        );
    }

    func.inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            LenientTokenizer::tokenize(&param.kind, arg).with_context(|| {
                format!("Argument `{}` is not a valid {}", arg, param.kind)
            })
        })
        .collect()
}

/// Legacy transaction when a gas price is configured, EIP-1559 otherwise.
pub fn build_transaction(
    to: Option<Address>,
    from: Address,
    data: Bytes,
    gas_limit: u64,
    gas_price: Option<u64>,
    nonce: Option<u64>,
) -> TypedTransaction {
    let mut tx = match gas_price {
        Some(gas_price) => TypedTransaction::Legacy(
            TransactionRequest::new().gas_price(gas_price),
        ),
        None => TypedTransaction::Eip1559(Eip1559TransactionRequest::new()),
    };

    tx.set_from(from);
    tx.set_data(data);
    tx.set_gas(gas_limit);

    if let Some(to) = to {
        tx.set_to(to);
    }

    if let Some(nonce) = nonce {
        tx.set_nonce(nonce);
    }

    tx
}
