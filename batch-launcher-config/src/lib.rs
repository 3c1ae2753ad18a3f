use std::env;
use std::fmt;
use std::str::FromStr;

use clap::Args;
use serde::Serialize;

/// Placeholder carried by values that were never configured.
pub const UNSET_TEXT: &str = "NOT_SET";

pub const DEFAULT_AWS_PROFILE: &str = "default";
pub const DEFAULT_AWS_REGION: &str = "eu-west-2";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_SEVERITY: &str = "High";
pub const DEFAULT_NOTIFICATION_TYPE: &str = "Warning";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("{0} is not set")]
    Missing(&'static str),
}

/// Command-line surface. Every value here can be overridden from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct LaunchArgs {
    #[arg(long, default_value = DEFAULT_AWS_PROFILE)]
    pub aws_profile: String,
    #[arg(long, default_value = DEFAULT_AWS_REGION)]
    pub aws_region: String,
    /// SNS topic ARN
    #[arg(long)]
    pub sns_topic: Option<String>,
    /// Environment value
    #[arg(long, default_value = UNSET_TEXT)]
    pub environment: String,
    /// Application
    #[arg(long, default_value = UNSET_TEXT)]
    pub application: String,
    /// Slack channel to use for overridden jobs
    #[arg(long)]
    pub slack_channel_override: Option<String>,
    /// Log level for the handler
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    #[arg(long)]
    pub batch_job_queue: Option<String>,
    #[arg(long)]
    pub batch_job_name: Option<String>,
    #[arg(long)]
    pub batch_job_definition_name: Option<String>,
    /// Job parameters as a JSON string
    #[arg(long)]
    pub batch_parameters_json: Option<String>,
}

impl Default for LaunchArgs {
    fn default() -> Self {
        Self {
            aws_profile: DEFAULT_AWS_PROFILE.to_string(),
            aws_region: DEFAULT_AWS_REGION.to_string(),
            sns_topic: None,
            environment: UNSET_TEXT.to_string(),
            application: UNSET_TEXT.to_string(),
            slack_channel_override: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            batch_job_queue: None,
            batch_job_name: None,
            batch_job_definition_name: None,
            batch_parameters_json: None,
        }
    }
}

/// Log verbosity, named the way operators set it (`INFO`, `WARNING`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

/// Resolved, immutable configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub aws: AwsConfig,
    pub logging: LoggingConfig,
    pub monitoring: MonitoringConfig,
    pub batch: BatchJobConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwsConfig {
    pub profile: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub environment: String,
    pub application: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringConfig {
    pub sns_topic: Option<String>,
    pub severity: String,
    pub notification_type: String,
    pub slack_channel_override: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchJobConfig {
    pub job_queue: Option<String>,
    pub job_name: Option<String>,
    pub job_definition_name: Option<String>,
    pub parameters_json: Option<String>,
}

/// The three identifiers a submission cannot do without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTarget<'a> {
    pub job_queue: &'a str,
    pub job_name: &'a str,
    pub job_definition_name: &'a str,
}

impl MonitoringConfig {
    /// The alert topic, or the fatal error raised when it is absent.
    pub fn require_topic(&self) -> Result<&str, ConfigError> {
        self.sns_topic
            .as_deref()
            .ok_or(ConfigError::Missing("MONITORING_SNS_TOPIC"))
    }
}

impl BatchJobConfig {
    pub fn require_target(&self) -> Result<JobTarget<'_>, ConfigError> {
        Ok(JobTarget {
            job_queue: require(&self.job_queue, "BATCH_JOB_QUEUE")?,
            job_name: require(&self.job_name, "BATCH_JOB_NAME")?,
            job_definition_name: require(
                &self.job_definition_name,
                "BATCH_JOB_DEFINITION_NAME",
            )?,
        })
    }
}

#[inline]
fn require<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::Missing(key))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws: AwsConfig {
                profile: DEFAULT_AWS_PROFILE.to_string(),
                region: DEFAULT_AWS_REGION.to_string(),
            },
            logging: LoggingConfig {
                level: LogLevel::Info,
                environment: UNSET_TEXT.to_string(),
                application: UNSET_TEXT.to_string(),
            },
            monitoring: MonitoringConfig {
                sns_topic: None,
                severity: DEFAULT_SEVERITY.to_string(),
                notification_type: DEFAULT_NOTIFICATION_TYPE.to_string(),
                slack_channel_override: None,
            },
            batch: BatchJobConfig {
                job_queue: None,
                job_name: None,
                job_definition_name: None,
                parameters_json: None,
            },
        }
    }
}

/// Drop empty values and the unset sentinel.
#[inline]
fn present(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == UNSET_TEXT {
        None
    } else {
        Some(value)
    }
}

type Applier = fn(&mut Config, String) -> Result<(), String>;

/// Assign the raw value to a `String` field.
macro_rules! text {
    ($($field:ident).+) => {{
        fn apply(cfg: &mut Config, value: String) -> Result<(), String> {
            cfg.$($field).+ = value;
            Ok(())
        }
        apply as Applier
    }};
}

/// Assign to an `Option<String>` field, treating blanks and the sentinel as unset.
macro_rules! optional {
    ($($field:ident).+) => {{
        fn apply(cfg: &mut Config, value: String) -> Result<(), String> {
            cfg.$($field).+ = present(value);
            Ok(())
        }
        apply as Applier
    }};
}

/// Parse the raw value with `FromStr` before assigning it.
macro_rules! parsed {
    ($($field:ident).+) => {{
        fn apply(cfg: &mut Config, value: String) -> Result<(), String> {
            cfg.$($field).+ = value.parse()?;
            Ok(())
        }
        apply as Applier
    }};
}

/// Environment overrides, applied in this order on top of command-line values.
const ENV_OVERRIDES: &[(&str, Applier)] = &[
    ("AWS_PROFILE", text!(aws.profile)),
    ("AWS_REGION", text!(aws.region)),
    ("ENVIRONMENT", text!(logging.environment)),
    ("APPLICATION", text!(logging.application)),
    ("MONITORING_SNS_TOPIC", optional!(monitoring.sns_topic)),
    ("MONITORING_ERRORS_SEVERITY", text!(monitoring.severity)),
    ("MONITORING_ERRORS_TYPE", text!(monitoring.notification_type)),
    ("SLACK_CHANNEL_OVERRIDE", optional!(monitoring.slack_channel_override)),
    ("BATCH_JOB_QUEUE", optional!(batch.job_queue)),
    ("BATCH_JOB_NAME", optional!(batch.job_name)),
    ("BATCH_JOB_DEFINITION_NAME", optional!(batch.job_definition_name)),
    ("BATCH_PARAMETERS_JSON", optional!(batch.parameters_json)),
    ("LOG_LEVEL", parsed!(logging.level)),
];

/// Names of every environment variable consulted during resolution.
pub fn env_override_keys() -> impl Iterator<Item = &'static str> {
    ENV_OVERRIDES.iter().map(|(key, _)| *key)
}

impl Config {
    /// Build the command-line layer on top of the defaults.
    pub fn from_args(args: &LaunchArgs) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        cfg.aws.profile = args.aws_profile.clone();
        cfg.aws.region = args.aws_region.clone();
        cfg.logging.environment = args.environment.clone();
        cfg.logging.application = args.application.clone();
        cfg.logging.level = args
            .log_level
            .parse()
            .map_err(|e| ConfigError::Parse(format!("invalid --log-level: {}", e)))?;
        cfg.monitoring.sns_topic = args.sns_topic.clone().and_then(present);
        cfg.monitoring.slack_channel_override =
            args.slack_channel_override.clone().and_then(present);
        cfg.batch.job_queue = args.batch_job_queue.clone().and_then(present);
        cfg.batch.job_name = args.batch_job_name.clone().and_then(present);
        cfg.batch.job_definition_name = args.batch_job_definition_name.clone().and_then(present);
        cfg.batch.parameters_json = args.batch_parameters_json.clone().and_then(present);
        Ok(cfg)
    }
}

/// Resolve configuration from arguments and the process environment.
/// Environment variables take precedence over arguments and defaults.
pub fn load_config(args: &LaunchArgs) -> Result<Config, ConfigError> {
    load_config_with(args, |key| env::var(key).ok())
}

/// Resolve configuration using `lookup` in place of the process environment.
pub fn load_config_with<F>(args: &LaunchArgs, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = Config::from_args(args)?;
    apply_env_overrides(&mut cfg, &lookup)?;
    Ok(cfg)
}

fn apply_env_overrides<F>(cfg: &mut Config, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (key, apply) in ENV_OVERRIDES {
        if let Some(value) = lookup(key) {
            apply(cfg, value).map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e)))?;
        }
    }
    Ok(())
}

/// Check that everything a submission needs is present.
/// The alert topic is checked first.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    cfg.monitoring.require_topic()?;
    cfg.batch.require_target()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MONITORING_SNS_TOPIC", "arn:aws:sns:eu-west-2:000000000000:alerts"),
            ("BATCH_JOB_QUEUE", "arn:aws:batch:eu-west-2:000000000000:job-queue/reconciliation"),
            ("BATCH_JOB_NAME", "athena-reconciliation"),
            ("BATCH_JOB_DEFINITION_NAME", "athena-reconciliation-def"),
        ]
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = load_config_with(&LaunchArgs::default(), |_| None).expect("load");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.aws.region, "eu-west-2");
        assert_eq!(cfg.logging.environment, UNSET_TEXT);
        assert_eq!(cfg.monitoring.severity, "High");
        assert_eq!(cfg.monitoring.notification_type, "Warning");
        assert_eq!(cfg.logging.level, LogLevel::Info);
    }

    #[test]
    fn env_overrides_arguments() {
        let args = LaunchArgs {
            aws_region: "us-east-1".into(),
            environment: "development".into(),
            batch_job_name: Some("from-args".into()),
            ..LaunchArgs::default()
        };
        let lookup = lookup_from(&[
            ("ENVIRONMENT", "production"),
            ("APPLICATION", "reconciliation"),
            ("BATCH_JOB_NAME", "from-env"),
            ("MONITORING_ERRORS_SEVERITY", "Critical"),
            ("MONITORING_ERRORS_TYPE", "Error"),
            ("LOG_LEVEL", "debug"),
        ]);

        let cfg = load_config_with(&args, lookup).expect("load");
        assert_eq!(cfg.aws.region, "us-east-1");
        assert_eq!(cfg.logging.environment, "production");
        assert_eq!(cfg.logging.application, "reconciliation");
        assert_eq!(cfg.batch.job_name.as_deref(), Some("from-env"));
        assert_eq!(cfg.monitoring.severity, "Critical");
        assert_eq!(cfg.monitoring.notification_type, "Error");
        assert_eq!(cfg.logging.level, LogLevel::Debug);
    }

    #[test]
    fn sentinel_and_blank_values_are_unset() {
        let lookup = lookup_from(&[
            ("SLACK_CHANNEL_OVERRIDE", UNSET_TEXT),
            ("MONITORING_SNS_TOPIC", "  "),
            ("BATCH_PARAMETERS_JSON", ""),
        ]);
        let cfg = load_config_with(&LaunchArgs::default(), lookup).expect("load");
        assert_eq!(cfg.monitoring.slack_channel_override, None);
        assert_eq!(cfg.monitoring.sns_topic, None);
        assert_eq!(cfg.batch.parameters_json, None);
    }

    #[test]
    fn invalid_log_level_names_the_variable() {
        let lookup = lookup_from(&[("LOG_LEVEL", "LOUD")]);
        let err = load_config_with(&LaunchArgs::default(), lookup).unwrap_err();
        match err {
            ConfigError::Parse(msg) => assert!(msg.starts_with("invalid LOG_LEVEL")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_log_level_argument() {
        let args = LaunchArgs {
            log_level: "chatty".into(),
            ..LaunchArgs::default()
        };
        assert!(matches!(
            Config::from_args(&args),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn log_level_names() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::Critical.as_directive(), "error");
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
    }

    #[test]
    fn validate_requires_topic_first() {
        let lookup = lookup_from(&[("BATCH_JOB_QUEUE", "queue")]);
        let cfg = load_config_with(&LaunchArgs::default(), lookup).expect("load");
        assert_eq!(
            validate_config(&cfg),
            Err(ConfigError::Missing("MONITORING_SNS_TOPIC"))
        );
    }

    #[test]
    fn validate_requires_job_fields() {
        let mut env = full_env();
        env.retain(|(k, _)| *k != "BATCH_JOB_DEFINITION_NAME");
        let cfg = load_config_with(&LaunchArgs::default(), lookup_from(&env)).expect("load");
        assert_eq!(
            validate_config(&cfg),
            Err(ConfigError::Missing("BATCH_JOB_DEFINITION_NAME"))
        );
    }

    #[test]
    fn complete_configuration_validates() {
        let cfg = load_config_with(&LaunchArgs::default(), lookup_from(&full_env())).expect("load");
        validate_config(&cfg).expect("valid");
        let target = cfg.batch.require_target().expect("target");
        assert_eq!(target.job_name, "athena-reconciliation");
        assert_eq!(target.job_definition_name, "athena-reconciliation-def");
    }

    #[test]
    fn override_table_order() {
        let keys: Vec<_> = env_override_keys().collect();
        assert_eq!(keys.first(), Some(&"AWS_PROFILE"));
        assert_eq!(keys.last(), Some(&"LOG_LEVEL"));
        assert_eq!(keys.len(), 13);
    }
}
