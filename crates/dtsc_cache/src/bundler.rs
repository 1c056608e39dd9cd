//! A [`Bundler`] backed by an external process.
//!
//! The process receives a JSON request on stdin:
//!
//! ```json
//! {"entries": [{"filePath": "src/index.ts"}], "preferredConfigPath": "tsconfig.json"}
//! ```
//!
//! and must print a JSON array with one declaration string per entry, in
//! order, on stdout. A non-zero exit status fails the batch.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::BundlerError;
use crate::scheduler::{Bundler, EntryPointConfig};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleRequest<'a> {
    entries: &'a [EntryPointConfig],
    preferred_config_path: Option<&'a Path>,
}

/// Runs a configured command once per batch.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandBundler {
    /// Creates a bundler that runs `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current_dir: None,
        }
    }

    /// Creates a bundler from an argv list; `None` if the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    /// Runs the process in `dir` instead of the current directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn spawn_error(&self, source: std::io::Error) -> BundlerError {
        BundlerError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn generate(
        &self,
        entries: &[EntryPointConfig],
        config_hint: Option<&Path>,
    ) -> Result<Vec<String>, BundlerError> {
        let request = serde_json::to_vec(&BundleRequest {
            entries,
            preferred_config_path: config_hint,
        })
        .map_err(|e| BundlerError::Other(format!("failed to encode bundler request: {e}")))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        debug!(program = %self.program, entries = entries.len(), "spawning bundler");
        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;
        let mut stdin = child.stdin.take().ok_or_else(|| {
            self.spawn_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "bundler stdin unavailable",
            ))
        })?;

        let feed = async move {
            stdin.write_all(&request).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(BundlerError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        // A bundler that exits successfully without reading all of stdin is fine.
        if let Err(e) = fed {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(self.spawn_error(e));
            }
        }

        serde_json::from_slice(&output.stdout).map_err(|e| BundlerError::InvalidOutput {
            reason: e.to_string(),
        })
    }
}
