use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use self::plan::Plan;
use self::sequencer::Sequencer;
use crate::cli::Args;
use crate::config::NetworksConfig;
use crate::network::NetworkProfile;
use crate::report::Report;
use crate::{interactive, serde_utils, signer};

pub mod deployment_context;
pub mod plan;
pub mod sequencer;

pub use self::deployment_context::DeploymentContext;

pub async fn run_deployment(cmd: Args) -> eyre::Result<()> {
    let networks = match cmd.networks.as_ref() {
        Some(path) => serde_utils::read_deserialize(path).await?,
        None => NetworksConfig::builtin(),
    };

    let profile = resolve_profile(&networks, &cmd)?;
    let plan = load_plan(cmd.plan.as_deref()).await?;

    info!(
        network = %profile.name,
        rpc_url = %profile.rpc_url,
        signer = %profile.signer,
        plan = %plan.name,
        steps = plan.steps.len(),
        "Resolved deployment"
    );

    sequencer::validate_order(&plan.steps)?;

    if cmd.dry_run {
        println!("{}", describe_plan(&profile, &plan));
        return Ok(());
    }

    let signer = signer::create_provider(&profile, &cmd.deployer).await?;
    let deployer = signer.deployer;
    let chain_id = signer.chain_id;

    if signer.is_wallet()
        && !cmd.yes
        && !interactive::confirm_deployment(&profile, deployer, &plan)?
    {
        info!("Deployment aborted");
        return Ok(());
    }

    let deployment_dir = PathBuf::from(
        cmd.deployment_name.unwrap_or_else(|| profile.name.clone()),
    );

    // The provider lives only as long as the context
    let result = {
        let context = DeploymentContext::new(
            profile.clone(),
            signer,
            cmd.contracts_root,
            cmd.etherscan_api_key,
        );

        let mut sequencer = Sequencer::new(&context, deployer);

        if let Some(timeout) = cmd.confirmation_timeout {
            sequencer = sequencer
                .with_confirmation_timeout(Duration::from_secs(timeout));
        }

        sequencer.run(&plan.steps).await?
    };

    let report =
        Report::new(&profile.name, chain_id, &plan.name, deployer, result);
    let report_path = report.write(&deployment_dir).await?;

    info!(path = %report_path.display(), "Report written");

    println!("{}", report.summary());

    Ok(())
}

fn resolve_profile(
    networks: &NetworksConfig,
    cmd: &Args,
) -> eyre::Result<NetworkProfile> {
    let mut profile = networks.resolve(&cmd.network)?;

    if let Some(rpc_url) = cmd.rpc_url.clone() {
        profile = profile.with_rpc_url(rpc_url);
    }

    if let Some(key_file) = cmd.key_file.as_ref() {
        profile = profile.with_key_file(key_file);
    }

    Ok(profile)
}

async fn load_plan(path: Option<&Path>) -> eyre::Result<Plan> {
    match path {
        Some(path) => serde_utils::read_deserialize(path).await,
        None => Ok(Plan::token_exchange()),
    }
}

fn describe_plan(profile: &NetworkProfile, plan: &Plan) -> String {
    let mut lines = vec![
        format!("Network: {} ({})", profile.name, profile.rpc_url),
        format!("Signer: {}", profile.signer),
        format!("Plan: {}", plan.name),
    ];

    lines.extend(
        plan.steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("  {}. {step}", i + 1)),
    );

    lines.join("\n")
}
