//! Batch job launcher entry point.
//!
//! Under the Lambda runtime (`AWS_LAMBDA_RUNTIME_API` set) this serves
//! invocations; otherwise it runs once against an event document on disk.

use std::process::ExitCode;
use std::sync::Arc;

use batch_launcher::clients::{AwsClients, SessionMode};
use batch_launcher::logging::{install_tracing, LogControl};
use batch_launcher::standalone::{log_working_directory, read_event_file};
use batch_launcher::{run_invocation, LauncherError};
use batch_launcher_config::{load_config, LaunchArgs, LogLevel};
use clap::Parser;
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;

mod cli;

use cli::CliArgs;

#[inline]
fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();

    let level = args.launch.log_level.parse().unwrap_or(LogLevel::Info);
    let log = install_tracing(level)?;

    if std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_some() {
        run_lambda(args.launch, log).await?;
        return Ok(ExitCode::SUCCESS);
    }

    match run_standalone(&args, &log).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "Standalone invocation finished");
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::error!(error = %error, "Exception occurred for invocation");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_lambda(launch: LaunchArgs, log: LogControl) -> anyhow::Result<()> {
    let config = load_config(&launch)?;
    let clients = Arc::new(AwsClients::load(&config, SessionMode::Lambda).await);
    let launch = Arc::new(launch);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let launch = Arc::clone(&launch);
        let clients = Arc::clone(&clients);
        let log = log.clone();
        async move {
            run_invocation(&launch, env_lookup, &log, clients.as_ref(), &event.payload).await?;
            Ok::<Value, lambda_runtime::Error>(Value::Null)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}

async fn run_standalone(
    args: &CliArgs,
    log: &LogControl,
) -> Result<batch_launcher::InvocationOutcome, LauncherError> {
    let config = load_config(&args.launch)?;
    let clients = AwsClients::load(&config, SessionMode::Standalone).await;

    log_working_directory();
    let event = read_event_file(&args.event_file)?;

    run_invocation(&args.launch, env_lookup, log, &clients, &event).await
}
