use ethers::types::Address;

use crate::deployment::plan::Plan;
use crate::network::NetworkProfile;

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
enum ConfirmMenu {
    #[display(fmt = "Proceed")]
    Proceed,
    #[display(fmt = "Show steps")]
    ShowSteps,
    #[display(fmt = "Abort")]
    Abort,
}

/// Asks the operator to approve a deployment that will spend real funds.
///
/// Escaping the prompt counts as a refusal.
pub fn confirm_deployment(
    profile: &NetworkProfile,
    deployer: Address,
    plan: &Plan,
) -> eyre::Result<bool> {
    println!("{}", deployment_info(profile, deployer, plan));

    loop {
        let choice = inquire::Select::new(
            "Send these transactions?",
            vec![
                ConfirmMenu::Proceed,
                ConfirmMenu::ShowSteps,
                ConfirmMenu::Abort,
            ],
        )
        .prompt_skippable()?;

        match choice {
            Some(ConfirmMenu::Proceed) => return Ok(true),
            Some(ConfirmMenu::ShowSteps) => {
                for (i, step) in plan.steps.iter().enumerate() {
                    println!("  {}. {step}", i + 1);
                }
            }
            Some(ConfirmMenu::Abort) | None => return Ok(false),
        }
    }
}

fn deployment_info(
    profile: &NetworkProfile,
    deployer: Address,
    plan: &Plan,
) -> String {
    let gas_price = match profile.gas_price {
        Some(gas_price) => format!("{gas_price} wei"),
        None => "node default".to_string(),
    };

    [
        format!("Network: {}", profile.name),
        format!("  RPC url: {}", profile.rpc_url),
        format!("  Gas limit: {}", profile.gas_limit),
        format!("  Gas price: {gas_price}"),
        format!("Deployer: {deployer:?}"),
        format!("Plan: {} ({} steps)", plan.name, plan.steps.len()),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use indoc::formatdoc;

    use super::*;
    use crate::config::NetworksConfig;

    #[test]
    fn shows_network_and_deployer() -> eyre::Result<()> {
        let profile = NetworksConfig::builtin().resolve("kovan")?;

        let info = deployment_info(
            &profile,
            Address::from_low_u64_be(1),
            &Plan::token_exchange(),
        );

        assert_eq!(
            info,
            formatdoc! {"
                Network: kovan
                  RPC url: {}
                  Gas limit: {}
                  Gas price: 5000000000 wei
                Deployer: 0x0000000000000000000000000000000000000001
                Plan: token-exchange (5 steps)",
                profile.rpc_url,
                profile.gas_limit,
            }
        );

        Ok(())
    }
}
