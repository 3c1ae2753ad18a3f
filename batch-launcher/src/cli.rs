use std::path::PathBuf;

use batch_launcher_config::LaunchArgs;
use clap::Parser;

use batch_launcher::standalone::DEFAULT_EVENT_PATH;

/// Submit a batch job and alert the monitoring topic when it is rejected.
#[derive(Debug, Parser)]
#[command(name = "batch-job-launcher", version)]
pub struct CliArgs {
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Event document used outside Lambda
    #[arg(long, default_value = DEFAULT_EVENT_PATH)]
    pub event_file: PathBuf,
}
