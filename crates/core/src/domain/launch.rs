// Launch Domain Model
// Template for starting one worker and the argv rendered from it

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default worker sub-command
pub const DEFAULT_SUBCOMMAND: &str = "rabbitmq:consumer";

/// Default destination for worker output
pub const DEFAULT_LOG_DESTINATION: &str = "/dev/null";

/// Everything needed to start one worker for a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Tokens placed before the program (e.g. `nice -n 10`)
    pub prefix: Vec<String>,
    pub program: String,
    pub subcommand: String,
    /// Environment tag passed as `--env=`
    pub environment: String,
    /// Messages a worker handles before exiting, passed as `--messages=`
    pub messages: u32,
    pub route: String,
    pub memory_limit: Option<u32>,
    pub worker_debug: bool,
    pub without_signals: bool,
    pub consumer: String,
    /// File that receives the worker's stdout and stderr (appended)
    pub log_destination: PathBuf,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Create a spec with defaults for everything but program and consumer
    pub fn new(program: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            prefix: Vec::new(),
            program: program.into(),
            subcommand: DEFAULT_SUBCOMMAND.to_string(),
            environment: "prod".to_string(),
            messages: 10,
            route: String::new(),
            memory_limit: None,
            worker_debug: false,
            without_signals: false,
            consumer: consumer.into(),
            log_destination: PathBuf::from(DEFAULT_LOG_DESTINATION),
            working_dir: None,
        }
    }

    /// Render the argument vector for one worker
    ///
    /// Layout: `[prefix..] program subcommand --env=E --messages=N --route=R
    /// [--memory-limit=M] [--debug] [--without-signals] consumer`.
    /// With a prefix, its first token becomes the program.
    pub fn render(&self) -> CommandLine {
        let mut argv: Vec<String> = self
            .prefix
            .iter()
            .filter(|token| !token.is_empty())
            .cloned()
            .collect();

        argv.push(self.program.clone());
        argv.push(self.subcommand.clone());
        argv.push(format!("--env={}", self.environment));
        argv.push(format!("--messages={}", self.messages));
        argv.push(format!("--route={}", self.route));

        if let Some(limit) = self.memory_limit {
            argv.push(format!("--memory-limit={}", limit));
        }
        if self.worker_debug {
            argv.push("--debug".to_string());
        }
        if self.without_signals {
            argv.push("--without-signals".to_string());
        }

        argv.push(self.consumer.clone());

        let program = argv.remove(0);
        CommandLine {
            program,
            args: argv,
            log_destination: self.log_destination.clone(),
            working_dir: self.working_dir.clone(),
        }
    }
}

/// A fully rendered worker invocation (argv-based, no shell involved)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub log_destination: PathBuf,
    pub working_dir: Option<PathBuf>,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        write!(
            f,
            " >> {}",
            shell_quote(&self.log_destination.to_string_lossy())
        )
    }
}

/// Quote a token for display so it can be pasted into a POSIX shell
fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));

    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

/// Outcome of one worker launch, kept for logging only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub command: String,
    pub pid: Option<u32>,
    pub launched_at: i64, // epoch ms
}

impl LaunchRecord {
    pub fn new(command: &CommandLine, pid: Option<u32>, launched_at: i64) -> Self {
        Self {
            command: command.to_string(),
            pid,
            launched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LaunchSpec {
        let mut spec = LaunchSpec::new("/srv/app/bin/console", "upload_picture");
        spec.route = "pictures".to_string();
        spec.messages = 50;
        spec
    }

    #[test]
    fn test_render_minimal_argv() {
        let command = spec().render();

        assert_eq!(command.program, "/srv/app/bin/console");
        assert_eq!(
            command.args,
            vec![
                "rabbitmq:consumer",
                "--env=prod",
                "--messages=50",
                "--route=pictures",
                "upload_picture",
            ]
        );
        assert_eq!(command.log_destination, PathBuf::from("/dev/null"));
    }

    #[test]
    fn test_render_optional_flags() {
        let mut spec = spec();
        spec.memory_limit = Some(256);
        spec.worker_debug = true;
        spec.without_signals = true;

        let args = spec.render().args;

        assert!(args.contains(&"--memory-limit=256".to_string()));
        assert!(args.contains(&"--debug".to_string()));
        assert!(args.contains(&"--without-signals".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("upload_picture"));
    }

    #[test]
    fn test_prefix_becomes_program() {
        let mut spec = spec();
        spec.prefix = vec!["nice".to_string(), "-n".to_string(), "10".to_string()];

        let command = spec.render();

        assert_eq!(command.program, "nice");
        assert_eq!(&command.args[..3], ["-n", "10", "/srv/app/bin/console"]);
    }

    #[test]
    fn test_empty_prefix_tokens_are_ignored() {
        let mut spec = spec();
        spec.prefix = vec![String::new()];

        assert_eq!(spec.render().program, "/srv/app/bin/console");
    }

    #[test]
    fn test_display_quotes_unsafe_tokens() {
        let mut spec = spec();
        spec.route = "a b".to_string();
        spec.consumer = "it's".to_string();
        spec.log_destination = PathBuf::from("/var/log/my workers.log");

        let shown = spec.render().to_string();

        assert!(shown.starts_with("/srv/app/bin/console rabbitmq:consumer"));
        assert!(shown.contains("'--route=a b'"));
        assert!(shown.contains(r"'it'\''s'"));
        assert!(shown.ends_with(">> '/var/log/my workers.log'"));
    }

    #[test]
    fn test_display_keeps_empty_route_bare() {
        let command = LaunchSpec::new("console", "c").render();
        assert!(command.to_string().contains(" --route= "));

        assert_eq!(shell_quote(""), "''");
    }
}
