//! Subcommand handlers: build the core clients and run the requested flow.

use std::path::Path;

use modelport_core::config::DeployConfig;
use modelport_core::{
    BedrockImportService, CloudFormationEngine, Deployer, HuggingFaceHub, S3Store,
};

use crate::{Commands, ConfigAction};

pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config: DeployConfig,
) -> anyhow::Result<()> {
    // Config management needs no AWS session.
    if let Commands::Config { action } = command {
        return handle_config(action, workspace, &config);
    }

    let sdk_config = modelport_core::aws::load_sdk_config(&config.aws).await;
    let engine = CloudFormationEngine::new(&sdk_config);
    let hub = HuggingFaceHub::new(&config.hub);
    let store = S3Store::new(&sdk_config, config.storage.transfer_acceleration);
    let import = BedrockImportService::new(&sdk_config);
    let deployer = Deployer::new(config, engine, hub, store, import);

    match command {
        Commands::Deploy => {
            let outcome = deployer.run().await?;
            println!("\nStack outputs:");
            println!("{}", outcome.outputs.to_pretty_json());
            println!(
                "\nStaged {} files ({} bytes), {} skipped.",
                outcome.stage.uploaded, outcome.stage.bytes, outcome.stage.skipped
            );
            println!("Import job '{}' created.", outcome.job_name);
            println!("Model import job ARN: {}", outcome.job_arn);
        }
        Commands::Stage => {
            let summary = deployer.stage().await?;
            println!(
                "Staged {} files ({} bytes), {} skipped.",
                summary.uploaded, summary.bytes, summary.skipped
            );
        }
        Commands::Import => {
            let (job_name, job_arn) = deployer.import().await?;
            println!("Import job '{}' created.", job_name);
            println!("Model import job ARN: {}", job_arn);
        }
        Commands::Package => {
            let outputs = deployer.push_package().await?;
            println!("Package uploaded and stack converged.");
            println!("{}", outputs.to_pretty_json());
        }
        Commands::Outputs => {
            let outputs = deployer.stack_outputs().await?;
            println!("{}", outputs.to_pretty_json());
        }
        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config: &DeployConfig,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let path = modelport_core::write_default_config(workspace)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
        }
    }
    Ok(())
}
