//! Self-assembling agent workflow orchestrator — CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use selfassembler::cli::{build_orchestrator, Cli, CliOutcome};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let outcome = match cli.dispatch() {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let run_result = tokio::select! {
        result = run(outcome) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            return ExitCode::from(130);
        }
    };

    match run_result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(outcome: CliOutcome) -> anyhow::Result<bool> {
    match outcome {
        CliOutcome::Handled => Ok(true),
        CliOutcome::Run { context, config } => {
            let mut orchestrator = build_orchestrator(*config)?;
            let result = orchestrator.run_workflow(context).await;
            if !result.success {
                if let Some(error) = &result.error {
                    eprintln!("workflow failed at phase {}: {error}", result.failed_phase.as_deref().unwrap_or("?"));
                }
            }
            Ok(result.success)
        }
        CliOutcome::Resume { checkpoint_id, config } => {
            let mut orchestrator = build_orchestrator(*config)?;
            let result = orchestrator.resume_workflow(&checkpoint_id).await?;
            Ok(result.success)
        }
    }
}
