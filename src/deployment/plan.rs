use std::fmt;

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::types::ContractId;

pub const TOKEN_EXCHANGE_PLAN: &str = "token-exchange";

/// Exchange rate between the two tokens, `2 * 10^16`.
pub const CONVERSION_RATE: u64 = 20_000_000_000_000_000;

pub const TOKEN_DECIMALS: u64 = 18;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub steps: Vec<DeploymentStep>,
}

/// One contract creation or method call. Steps run in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStep {
    #[serde(flatten)]
    pub action: StepAction,

    /// Account sending the transaction, the deployer when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    Deploy {
        contract: ContractId,
        /// Name of the compiled contract, `Name` or `path/File.sol:Name`
        artifact: String,
        #[serde(default)]
        args: Vec<StepArg>,
    },
    Call {
        target: ContractId,
        method: String,
        #[serde(default)]
        args: Vec<StepArg>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepArg {
    /// Address recorded by an earlier deploy step
    AddressOf { address_of: ContractId },
    Bool(bool),
    Integer(u64),
    Text(String),
}

impl DeploymentStep {
    pub fn deploy(
        contract: impl Into<ContractId>,
        artifact: impl ToString,
        args: Vec<StepArg>,
    ) -> Self {
        Self {
            action: StepAction::Deploy {
                contract: contract.into(),
                artifact: artifact.to_string(),
                args,
            },
            from: None,
        }
    }

    pub fn call(
        target: impl Into<ContractId>,
        method: impl ToString,
        args: Vec<StepArg>,
    ) -> Self {
        Self {
            action: StepAction::Call {
                target: target.into(),
                method: method.to_string(),
                args,
            },
            from: None,
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn args(&self) -> &[StepArg] {
        match &self.action {
            StepAction::Deploy { args, .. } | StepAction::Call { args, .. } => {
                args
            }
        }
    }

    /// Every contract this step needs to have been deployed already.
    pub fn references(&self) -> impl Iterator<Item = &ContractId> {
        let target = match &self.action {
            StepAction::Call { target, .. } => Some(target),
            StepAction::Deploy { .. } => None,
        };

        target.into_iter().chain(self.args().iter().filter_map(|arg| {
            match arg {
                StepArg::AddressOf { address_of } => Some(address_of),
                _ => None,
            }
        }))
    }
}

impl fmt::Display for DeploymentStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.action {
            StepAction::Deploy {
                contract, artifact, ..
            } => write!(f, "deploy {contract} ({artifact})"),
            StepAction::Call { target, method, .. } => {
                write!(f, "call {target}.{method}")
            }
        }
    }
}

impl StepArg {
    pub fn address_of(contract: impl Into<ContractId>) -> Self {
        Self::AddressOf {
            address_of: contract.into(),
        }
    }

    pub fn text(value: impl ToString) -> Self {
        Self::Text(value.to_string())
    }
}

impl Plan {
    /// Two tokens, an exchange between them, and minter rights for the
    /// exchange on both tokens.
    pub fn token_exchange() -> Self {
        let token = |name: &str, symbol: &str| {
            vec![
                StepArg::text(name),
                StepArg::text(symbol),
                StepArg::Integer(TOKEN_DECIMALS),
            ]
        };

        Self {
            name: TOKEN_EXCHANGE_PLAN.to_string(),
            steps: vec![
                DeploymentStep::deploy(
                    "ACMEToken",
                    "Token",
                    token("ACME Corporation", "ACME"),
                ),
                DeploymentStep::deploy(
                    "UmbrellaToken",
                    "Token",
                    token("Umbrella Corporation", "UMB"),
                ),
                DeploymentStep::deploy(
                    "Exchange",
                    "Exchange",
                    vec![
                        StepArg::Integer(CONVERSION_RATE),
                        StepArg::address_of("UmbrellaToken"),
                        StepArg::address_of("ACMEToken"),
                    ],
                ),
                DeploymentStep::call(
                    "ACMEToken",
                    "addMinter",
                    vec![StepArg::address_of("Exchange")],
                ),
                DeploymentStep::call(
                    "UmbrellaToken",
                    "addMinter",
                    vec![StepArg::address_of("Exchange")],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn token_exchange_plan_shape() {
        let plan = Plan::token_exchange();

        let described: Vec<_> =
            plan.steps.iter().map(ToString::to_string).collect();

        assert_eq!(
            described,
            vec![
                "deploy ACMEToken (Token)",
                "deploy UmbrellaToken (Token)",
                "deploy Exchange (Exchange)",
                "call ACMEToken.addMinter",
                "call UmbrellaToken.addMinter",
            ]
        );

        let exchange_refs: Vec<_> = plan.steps[2].references().collect();
        assert_eq!(
            exchange_refs,
            vec![
                &ContractId::from("UmbrellaToken"),
                &ContractId::from("ACMEToken")
            ]
        );

        let minter_refs: Vec<_> = plan.steps[3].references().collect();
        assert_eq!(
            minter_refs,
            vec![&ContractId::from("ACMEToken"), &ContractId::from("Exchange")]
        );
    }

    #[test]
    fn parses_yaml_plan() -> eyre::Result<()> {
        let plan: Plan = serde_yaml::from_str(indoc! {r#"
            name: single-token
            steps:
              - kind: deploy
                contract: Gold
                artifact: contracts/Token.sol:Token
                args: ["Gold", "GLD", 18]
              - kind: call
                target: Gold
                method: addMinter
                from: "0x0000000000000000000000000000000000000007"
                args:
                  - address_of: Gold
              - kind: call
                target: Gold
                method: setPaused
                args: [true]
        "#})?;

        assert_eq!(plan.name, "single-token");
        assert_eq!(
            plan.steps[0],
            DeploymentStep::deploy(
                "Gold",
                "contracts/Token.sol:Token",
                vec![
                    StepArg::text("Gold"),
                    StepArg::text("GLD"),
                    StepArg::Integer(18),
                ],
            )
        );
        assert_eq!(
            plan.steps[1],
            DeploymentStep::call(
                "Gold",
                "addMinter",
                vec![StepArg::address_of("Gold")]
            )
            .with_from(Address::from_low_u64_be(7))
        );
        assert_eq!(plan.steps[2].args(), &[StepArg::Bool(true)]);

        Ok(())
    }

    #[test]
    fn parses_toml_plan() -> eyre::Result<()> {
        let plan: Plan = toml::from_str(indoc! {r#"
            name = "toml"

            [[steps]]
            kind = "deploy"
            contract = "Gold"
            artifact = "Token"
            args = ["Gold", "GLD", 18]

            [[steps]]
            kind = "call"
            target = "Gold"
            method = "addMinter"
            args = [{ address_of = "Gold" }]
        "#})?;

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].args()[2], StepArg::Integer(18));
        assert_eq!(plan.steps[1].args(), &[StepArg::address_of("Gold")]);

        Ok(())
    }
}
