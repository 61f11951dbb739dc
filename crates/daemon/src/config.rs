//! Scaler settings and the configuration-backed policy source
//!
//! Settings come from an optional TOML file layered under `MQSCALER__*`
//! environment variables (e.g. `MQSCALER__BROKER__URL`).

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mqscaler_core::application::autoscaler::constants::{
    DEFAULT_MAX_CONSUMERS, DEFAULT_MAX_ITERATIONS, DEFAULT_MESSAGES_PER_CONSUMER,
    DEFAULT_MIN_CONSUMERS, DEFAULT_POLL_INTERVAL,
};
use mqscaler_core::domain::launch::{DEFAULT_LOG_DESTINATION, DEFAULT_SUBCOMMAND};
use mqscaler_core::domain::queue::DEFAULT_VHOST;
use mqscaler_core::domain::{LaunchSpec, QueueIdentity, ScalingPolicy};
use mqscaler_core::port::PolicySource;
use mqscaler_core::{AppError, Result};
use mqscaler_infra_rabbitmq::management_api::{DEFAULT_MANAGEMENT_URL, DEFAULT_REQUEST_TIMEOUT};
use mqscaler_infra_rabbitmq::ManagementApiConfig;
use mqscaler_infra_system::DetachedProcessLauncher;

pub const DEFAULT_CONFIG_PATH: &str = "~/.mqscaler/config.toml";
const ENV_PREFIX: &str = "MQSCALER";

/// Global defaults plus per-consumer queue options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScalerSettings {
    pub debug: bool,
    pub min_consumers: u32,
    pub max_consumers: u32,
    pub messages: u32,
    pub interval_secs: u64,
    pub iterations: u64,
    pub command: String,
    pub prefix: Vec<String>,
    pub log: String,
    pub worker: WorkerSettings,
    pub broker: BrokerSettings,
    pub consumers: HashMap<String, ConsumerSettings>,
}

impl Default for ScalerSettings {
    fn default() -> Self {
        Self {
            debug: false,
            min_consumers: DEFAULT_MIN_CONSUMERS,
            max_consumers: DEFAULT_MAX_CONSUMERS,
            messages: DEFAULT_MESSAGES_PER_CONSUMER,
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            iterations: DEFAULT_MAX_ITERATIONS,
            command: DEFAULT_SUBCOMMAND.to_string(),
            prefix: Vec::new(),
            log: DEFAULT_LOG_DESTINATION.to_string(),
            worker: WorkerSettings::default(),
            broker: BrokerSettings::default(),
            consumers: HashMap::new(),
        }
    }
}

/// How workers are started
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub program: String,
    pub environment: String,
    pub working_dir: Option<String>,
    /// When set, workers only receive these environment variables
    pub env_allowlist: Option<Vec<String>>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            program: "bin/console".to_string(),
            environment: "prod".to_string(),
            working_dir: None,
            env_allowlist: None,
        }
    }
}

impl WorkerSettings {
    pub fn launcher(&self) -> DetachedProcessLauncher {
        match &self.env_allowlist {
            Some(allowlist) => {
                DetachedProcessLauncher::new().with_env_allowlist(allowlist.clone())
            }
            None => DetachedProcessLauncher::new(),
        }
    }
}

/// Management API connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub url: String,
    pub username: String,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_MANAGEMENT_URL.to_string(),
            username: "guest".to_string(),
            password: Some("guest".to_string()),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl BrokerSettings {
    pub fn management_config(&self) -> ManagementApiConfig {
        ManagementApiConfig {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Queue options for one consumer, with optional scaling overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    /// Broker queue name, defaults to the consumer name
    pub queue: Option<String>,
    pub vhost: Option<String>,
    pub route: String,
    pub memory_limit: Option<u32>,
    pub without_signals: bool,
    pub min_consumers: Option<u32>,
    pub max_consumers: Option<u32>,
    pub messages: Option<u32>,
    pub interval_secs: Option<u64>,
}

impl ScalerSettings {
    /// Load settings from `path` (TOML) and the environment
    ///
    /// A missing file is an error only when `required` is set.
    pub fn load(path: &Path, required: bool) -> std::result::Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(required))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Parse settings from TOML text (environment still applies)
    #[cfg(test)]
    pub fn from_toml(content: &str) -> std::result::Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Find the entry for a consumer, falling back to a case-insensitive match
    fn consumer(&self, name: &str) -> Option<&ConsumerSettings> {
        self.consumers.get(name).or_else(|| {
            self.consumers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, entry)| entry)
        })
    }
}

/// `MQSCALER__*` variables; list keys are whitespace-separated
/// (`MQSCALER__PREFIX="nice -n 10"`)
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(" ")
        .with_list_parse_key("prefix")
        .with_list_parse_key("worker.env_allowlist")
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
    }
}

/// Policy source backed by [`ScalerSettings`]
pub struct SettingsPolicySource {
    settings: ScalerSettings,
}

impl SettingsPolicySource {
    pub fn new(settings: ScalerSettings) -> Self {
        Self { settings }
    }
}

impl PolicySource for SettingsPolicySource {
    fn resolve_policy(&self, consumer: &str) -> Result<ScalingPolicy> {
        let s = &self.settings;
        let entry = s
            .consumer(consumer)
            .ok_or_else(|| AppError::MissingQueueOptions(consumer.to_string()))?;

        let messages = entry.messages.unwrap_or(s.messages);
        let queue = QueueIdentity::new(consumer, entry.queue.as_deref().unwrap_or(consumer))
            .with_vhost(entry.vhost.as_deref().unwrap_or(DEFAULT_VHOST));

        let launch_spec = LaunchSpec {
            prefix: s.prefix.clone(),
            program: expand_path(&s.worker.program).to_string_lossy().into_owned(),
            subcommand: s.command.clone(),
            environment: s.worker.environment.clone(),
            messages,
            route: entry.route.clone(),
            memory_limit: entry.memory_limit,
            worker_debug: s.debug,
            without_signals: entry.without_signals,
            consumer: consumer.to_string(),
            log_destination: expand_path(&s.log),
            working_dir: s.worker.working_dir.as_deref().map(expand_path),
        };

        Ok(ScalingPolicy {
            queue,
            min_consumers: entry.min_consumers.unwrap_or(s.min_consumers),
            max_consumers: entry.max_consumers.unwrap_or(s.max_consumers),
            messages_per_consumer: messages,
            poll_interval: Duration::from_secs(entry.interval_secs.unwrap_or(s.interval_secs)),
            max_iterations: s.iterations,
            launch_spec,
            debug: s.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const SAMPLE: &str = r#"
        min_consumers = 2
        max_consumers = 8
        messages = 25
        interval_secs = 5
        prefix = ["nice", "-n", "10"]
        log = "/var/log/workers.log"

        [worker]
        program = "/srv/app/bin/console"
        environment = "staging"

        [broker]
        url = "http://rabbit:15672"
        username = "scaler"
        password = "secret"

        [consumers.upload_picture]
        queue = "upload-picture"
        route = "pictures"
        memory_limit = 256

        [consumers.mailer]
        vhost = "mail"
        max_consumers = 3
        interval_secs = 30
    "#;

    #[test]
    fn test_defaults_without_config_file() {
        let settings = ScalerSettings::default();

        assert_eq!(settings.min_consumers, 1);
        assert_eq!(settings.max_consumers, 10);
        assert_eq!(settings.messages, 10);
        assert_eq!(settings.interval_secs, 10);
        assert_eq!(settings.iterations, 0);
        assert_eq!(settings.command, "rabbitmq:consumer");
        assert_eq!(settings.log, "/dev/null");
        assert!(settings.prefix.is_empty());
    }

    #[test]
    fn test_resolve_policy_from_file_values() {
        let settings = assert_ok!(ScalerSettings::from_toml(SAMPLE));
        let source = SettingsPolicySource::new(settings);

        let policy = assert_ok!(source.resolve_policy("upload_picture"));

        assert_eq!(policy.queue.queue, "upload-picture");
        assert_eq!(policy.queue.vhost, "/");
        assert_eq!(policy.min_consumers, 2);
        assert_eq!(policy.max_consumers, 8);
        assert_eq!(policy.messages_per_consumer, 25);
        assert_eq!(policy.poll_interval, Duration::from_secs(5));
        assert_eq!(policy.launch_spec.messages, 25);
        assert_eq!(policy.launch_spec.route, "pictures");
        assert_eq!(policy.launch_spec.memory_limit, Some(256));
        assert_eq!(policy.launch_spec.environment, "staging");
        assert_eq!(policy.launch_spec.prefix, vec!["nice", "-n", "10"]);
        assert_eq!(
            policy.launch_spec.log_destination,
            PathBuf::from("/var/log/workers.log")
        );

        let command = policy.launch_spec.render();
        assert_eq!(command.program, "nice");
        assert_eq!(command.args.last().map(String::as_str), Some("upload_picture"));
    }

    #[test]
    fn test_per_consumer_overrides() {
        let source = SettingsPolicySource::new(ScalerSettings::from_toml(SAMPLE).unwrap());

        let policy = source.resolve_policy("mailer").unwrap();

        assert_eq!(policy.queue.queue, "mailer");
        assert_eq!(policy.queue.vhost, "mail");
        assert_eq!(policy.max_consumers, 3);
        assert_eq!(policy.min_consumers, 2);
        assert_eq!(policy.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_unknown_consumer_is_missing_queue_options() {
        let source = SettingsPolicySource::new(ScalerSettings::from_toml(SAMPLE).unwrap());

        let err = assert_err!(source.resolve_policy("ghost"));

        assert!(matches!(err, AppError::MissingQueueOptions(ref name) if name == "ghost"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_consumer_lookup_ignores_case() {
        let source = SettingsPolicySource::new(ScalerSettings::from_toml(SAMPLE).unwrap());

        let policy = source.resolve_policy("Mailer").unwrap();

        assert_eq!(policy.queue.consumer, "Mailer");
        assert_eq!(policy.max_consumers, 3);
    }

    #[test]
    fn test_broker_settings_to_management_config() {
        let settings = ScalerSettings::from_toml(SAMPLE).unwrap();
        let config = settings.broker.management_config();

        assert_eq!(config.url, "http://rabbit:15672");
        assert_eq!(config.username, "scaler");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let settings = ScalerSettings::load(&path, true).unwrap();

        assert_eq!(settings.worker.program, "/srv/app/bin/console");
        assert_eq!(settings.consumers.len(), 2);
    }

    #[test]
    fn test_missing_optional_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ScalerSettings::load(&dir.path().join("absent.toml"), false).unwrap();

        assert_eq!(settings.max_consumers, DEFAULT_MAX_CONSUMERS);
        assert!(settings.consumers.is_empty());
    }

    #[test]
    fn test_missing_required_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ScalerSettings::load(&dir.path().join("absent.toml"), true).is_err());
    }

    fn from_env(vars: &[(&str, &str)]) -> ScalerSettings {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Config::builder()
            .add_source(File::from_str(SAMPLE, FileFormat::Toml))
            .add_source(env_source().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_env_prefix_is_split_on_whitespace() {
        let settings = from_env(&[("MQSCALER__PREFIX", "ionice -c 3")]);

        assert_eq!(settings.prefix, vec!["ionice", "-c", "3"]);
        assert_eq!(settings.min_consumers, 2);
    }

    #[test]
    fn test_env_overrides_nested_and_scalar_keys() {
        let settings = from_env(&[
            ("MQSCALER__MAX_CONSUMERS", "12"),
            ("MQSCALER__BROKER__URL", "http://mq:15672"),
            ("MQSCALER__WORKER__ENV_ALLOWLIST", "PATH HOME"),
        ]);

        assert_eq!(settings.max_consumers, 12);
        assert_eq!(settings.broker.url, "http://mq:15672");
        assert_eq!(
            settings.worker.env_allowlist,
            Some(vec!["PATH".to_string(), "HOME".to_string()])
        );
        assert_eq!(settings.prefix, vec!["nice", "-n", "10"]);
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/workers.log");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert_eq!(expand_path("/dev/null"), PathBuf::from("/dev/null"));
    }
}
