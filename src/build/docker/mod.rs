//! Docker CLI backed build engine.
//!
//! Each build environment is an image tagged with the release tag plus one
//! container created from it. Destroying an environment removes both.

mod guard;

use super::{BuildEngine, BuildEnvironment, BuildRequest, EnvironmentState};
use crate::cli::OutputManager;
use crate::error::{BuildError, ExtractionError, Result};
use guard::ContainerGuard;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

/// Timeout for the `docker info` availability check
pub const DOCKER_INFO_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks that the docker CLI is installed and the daemon answers.
pub async fn check_docker_available() -> Result<()> {
    which::which("docker").map_err(|e| BuildError::EngineUnavailable {
        reason: format!("docker command not found on PATH: {}", e),
    })?;

    let status = timeout(
        DOCKER_INFO_TIMEOUT,
        Command::new("docker")
            .arg("info")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status(),
    )
    .await;

    match status {
        Err(_) => Err(BuildError::EngineUnavailable {
            reason: format!(
                "docker info timed out after {} seconds",
                DOCKER_INFO_TIMEOUT.as_secs()
            ),
        }
        .into()),
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(BuildError::EngineUnavailable {
            reason: format!(
                "Docker daemon is not responding (exit code: {})",
                status.code().unwrap_or(-1)
            ),
        }
        .into()),
        Ok(Err(e)) => Err(BuildError::EngineUnavailable {
            reason: e.to_string(),
        }
        .into()),
    }
}

/// A Docker image plus the container started from it
#[derive(Debug)]
pub struct DockerEnvironment {
    tag: String,
    state: EnvironmentState,
    guard: ContainerGuard,
}

impl DockerEnvironment {
    /// Name of the container, once one has been created
    pub fn container(&self) -> Option<&str> {
        self.guard.container.as_deref()
    }
}

impl BuildEnvironment for DockerEnvironment {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn state(&self) -> EnvironmentState {
        self.state
    }
}

/// Build engine driving the `docker` CLI
#[derive(Debug, Clone)]
pub struct DockerEngine {
    output: OutputManager,
}

impl DockerEngine {
    /// Create an engine that streams build output through `output`
    pub fn new(output: OutputManager) -> Self {
        Self { output }
    }

    async fn run(&self, args: &[&str]) -> std::io::Result<Output> {
        log::debug!("docker {}", args.join(" "));
        Command::new("docker")
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
    }
}

impl BuildEngine for DockerEngine {
    type Environment = DockerEnvironment;

    async fn build(&self, request: &BuildRequest) -> Result<DockerEnvironment> {
        let manifest = request.manifest_path.to_string_lossy().into_owned();
        let context = request.context_dir.to_string_lossy().into_owned();

        let mut args = vec![
            "build".to_string(),
            "-f".to_string(),
            manifest,
            "-t".to_string(),
            request.tag.clone(),
        ];
        for build_arg in request.rendered_build_args() {
            args.push("--build-arg".to_string());
            args.push(build_arg);
        }
        args.push(context);

        log::debug!("docker {}", args.join(" "));

        let mut child = Command::new("docker")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BuildError::BuildFailed {
                tag: request.tag.clone(),
                reason: e.to_string(),
            })?;

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                self.output.verbose(&line);
            }
        }

        let status = child.wait().await.map_err(|e| BuildError::BuildFailed {
            tag: request.tag.clone(),
            reason: e.to_string(),
        })?;

        if !status.success() {
            return Err(BuildError::BuildFailed {
                tag: request.tag.clone(),
                reason: format!("docker build exited with code {}", status.code().unwrap_or(-1)),
            }
            .into());
        }

        Ok(DockerEnvironment {
            tag: request.tag.clone(),
            state: EnvironmentState::Built,
            guard: ContainerGuard::new(request.tag.clone()),
        })
    }

    async fn start(&self, environment: &mut DockerEnvironment) -> Result<()> {
        let tag = environment.tag.clone();
        let start_failed = |reason: String| BuildError::StartFailed {
            tag: tag.clone(),
            reason,
        };

        let name = format!("babirusa-{}-{}", tag, Uuid::new_v4().simple());

        let created = self
            .run(&["create", "--name", &name, &tag])
            .await
            .map_err(|e| start_failed(e.to_string()))?;
        if !created.status.success() {
            return Err(start_failed(String::from_utf8_lossy(&created.stderr).trim().to_string()).into());
        }
        environment.guard.container = Some(name.clone());

        let started = self
            .run(&["start", &name])
            .await
            .map_err(|e| start_failed(e.to_string()))?;
        if !started.status.success() {
            return Err(start_failed(String::from_utf8_lossy(&started.stderr).trim().to_string()).into());
        }

        environment.state = EnvironmentState::Started;
        Ok(())
    }

    async fn copy_out(
        &self,
        environment: &DockerEnvironment,
        source: &str,
        destination: &Path,
    ) -> Result<()> {
        let container = environment
            .container()
            .ok_or_else(|| ExtractionError::NotStarted {
                tag: environment.tag.clone(),
            })?;

        let from = format!("{}:{}", container, source);
        let to = destination.to_string_lossy().into_owned();
        let output = self
            .run(&["cp", &from, &to])
            .await
            .map_err(|e| ExtractionError::WriteFailed {
                destination: destination.to_path_buf(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("Could not find the file") || stderr.contains("No such container:path") {
            Err(ExtractionError::SourceMissing {
                tag: environment.tag.clone(),
                path: source.to_string(),
            }
            .into())
        } else {
            Err(ExtractionError::WriteFailed {
                destination: destination.to_path_buf(),
                reason: stderr,
            }
            .into())
        }
    }

    async fn destroy(&self, mut environment: DockerEnvironment) -> Result<()> {
        let mut failures = Vec::new();

        if let Some(container) = environment.guard.container.clone() {
            match self.run(&["rm", "-f", &container]).await {
                Ok(output) if output.status.success() => {}
                Ok(output) => failures.push(String::from_utf8_lossy(&output.stderr).trim().to_string()),
                Err(e) => failures.push(e.to_string()),
            }
        }

        match self.run(&["rmi", "-f", &environment.tag]).await {
            Ok(output) if output.status.success() => {}
            Ok(output) => failures.push(String::from_utf8_lossy(&output.stderr).trim().to_string()),
            Err(e) => failures.push(e.to_string()),
        }

        environment.guard.disarm();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BuildError::DestroyFailed {
                tag: environment.tag.clone(),
                reason: failures.join("; "),
            }
            .into())
        }
    }
}
