use clap::Parser;
use cli::Args;
use error::DeployError;
use indicatif::ProgressStyle;
use tracing_error::ErrorLayer;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub mod ethers_utils;
pub mod forge_utils;
pub mod serde_utils;

mod cli;
mod config;
mod deployment;
mod error;
mod interactive;
mod network;
mod report;
mod signer;
mod types;

async fn start() -> eyre::Result<()> {
    let args = Args::parse();

    deployment::run_deployment(args).await
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    dotenv::dotenv().ok();

    let indicatif_layer = IndicatifLayer::new().with_progress_style(
        ProgressStyle::with_template(
            "{span_child_prefix}{spinner} {span_name}{{{span_fields}}} [{elapsed}]",
        )?,
    );

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(filter),
        )
        .with(indicatif_layer)
        .with(ErrorLayer::default())
        .init();

    match start().await {
        Ok(()) => Ok(()),
        Err(err) => {
            if let Some(index) = err
                .downcast_ref::<DeployError>()
                .and_then(DeployError::step_index)
            {
                tracing::error!(
                    %index,
                    "Deployment stopped, steps before it stay on chain"
                );
            }

            tracing::error!("{:?}", err);
            std::process::exit(1)
        }
    }
}
