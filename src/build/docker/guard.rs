//! Drop guard for Docker build environments.
//!
//! Backstop for handles that are dropped without going through
//! `DockerEngine::destroy`, e.g. while unwinding from a panic.

use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Upper bound for each cleanup command run from `drop`
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Removes the container and image of an environment when dropped while armed.
#[derive(Debug)]
pub(super) struct ContainerGuard {
    pub(super) image: String,
    pub(super) container: Option<String>,
    armed: bool,
}

impl ContainerGuard {
    pub(super) fn new(image: String) -> Self {
        Self {
            image,
            container: None,
            armed: true,
        }
    }

    /// Explicit teardown happened; nothing left to do on drop.
    pub(super) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        if let Some(container) = &self.container {
            run_cleanup(&["rm", "-f", container]);
        }
        run_cleanup(&["rmi", "-f", &self.image]);
    }
}

/// Run a docker cleanup command synchronously, bounded by [`CLEANUP_TIMEOUT`].
///
/// Errors are logged and swallowed; drop must never panic.
fn run_cleanup(args: &[&str]) {
    let mut child = match Command::new("docker")
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            log::warn!("Could not spawn 'docker {}': {}", args.join(" "), e);
            return;
        }
    };

    match child.wait_timeout(CLEANUP_TIMEOUT) {
        Ok(Some(status)) if !status.success() => {
            log::warn!(
                "'docker {}' exited with code {}",
                args.join(" "),
                status.code().unwrap_or(-1)
            );
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            log::warn!(
                "'docker {}' timed out after {} seconds. Docker daemon may be down.",
                args.join(" "),
                CLEANUP_TIMEOUT.as_secs()
            );
        }
        Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
