// Detached process launcher
// reason: tokio::process reaps dropped children in the background
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::fs::OpenOptions;
use tokio::process::Command;
use tracing::debug;

use mqscaler_core::domain::CommandLine;
use mqscaler_core::port::process_launcher::{LaunchError, LaunchOutcome, ProcessLauncher};

/// Detached process launcher
/// Spawns workers from an argument vector (no shell) in their own process
/// group, with stdin closed and stdout/stderr appended to the log destination
#[derive(Debug, Default, Clone)]
pub struct DetachedProcessLauncher {
    env_allowlist: Option<Vec<String>>,
}

impl DetachedProcessLauncher {
    /// Create a launcher whose workers inherit the full environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Only pass the listed environment variables to workers
    ///
    /// # Example
    /// ```ignore
    /// let launcher = DetachedProcessLauncher::new()
    ///     .with_env_allowlist(vec!["PATH".to_string(), "HOME".to_string()]);
    /// ```
    pub fn with_env_allowlist(mut self, allowlist: Vec<String>) -> Self {
        self.env_allowlist = Some(allowlist);
        self
    }

    /// Environment handed to the worker, `None` = inherit everything
    fn filter_env(
        &self,
        env: impl Iterator<Item = (String, String)>,
    ) -> Option<Vec<(String, String)>> {
        self.env_allowlist
            .as_ref()
            .map(|allowlist| env.filter(|(k, _)| allowlist.contains(k)).collect())
    }

    /// Open the log destination for appending, creating it if needed
    async fn open_log(&self, path: &Path) -> Result<std::fs::File, LaunchError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| LaunchError::LogDestination {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(file.into_std().await)
    }

    fn build_command(
        &self,
        command: &CommandLine,
        log: std::fs::File,
    ) -> Result<Command, LaunchError> {
        let stderr = log.try_clone().map_err(|source| LaunchError::LogDestination {
            path: command.log_destination.clone(),
            source,
        })?;

        let mut std_command = std::process::Command::new(&command.program);
        std_command
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr));

        if let Some(dir) = &command.working_dir {
            std_command.current_dir(dir);
        }

        if let Some(env) = self.filter_env(std::env::vars()) {
            std_command.env_clear().envs(env);
        }

        // Own process group: a Ctrl+C aimed at the scaler does not reach workers
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_command.process_group(0);
        }

        Ok(Command::from(std_command))
    }
}

#[async_trait]
impl ProcessLauncher for DetachedProcessLauncher {
    async fn launch(&self, command: &CommandLine) -> Result<LaunchOutcome, LaunchError> {
        debug!(
            program = %command.program,
            args = ?command.args,
            log = %command.log_destination.display(),
            "Starting detached worker"
        );

        let log = self.open_log(&command.log_destination).await?;
        let mut process = self.build_command(command, log)?;

        let child = process
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| LaunchError::LaunchFailed {
                command: command.to_string(),
                source,
            })?;

        let pid = child.id();
        debug!(pid = ?pid, program = %command.program, "Detached worker started");

        // Fire-and-forget: the handle is dropped, the worker keeps running
        drop(child);

        Ok(LaunchOutcome { pid })
    }
}
