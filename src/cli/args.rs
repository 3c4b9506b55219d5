//! Command line argument parsing and validation.
//!
//! Two tiers: a fixed set of recognized options parsed by clap, and a
//! pass-through bag collecting every unrecognized `--name[=value]` flag. The
//! bag is forwarded to the build engine as build arguments.

use crate::build::FailurePolicy;
use crate::error::{CliError, Result};
use crate::github::{DEFAULT_API_URL, DEFAULT_UPLOAD_URL, RepoCoordinates};
use crate::{BuildSettings, DEFAULT_REPOSITORY};
use clap::{CommandFactory, Parser};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::path::PathBuf;

/// Pass-through flags, keyed by flag name without the leading dashes
pub type PassThrough = BTreeMap<String, Option<String>>;

/// Build PHP binaries for every platform Dockerfile and publish them
#[derive(Parser, Debug)]
#[command(
    name = "babirusa-builder",
    version,
    about = "Build PHP CLI binaries per platform and publish them to GitHub releases",
    long_about = "Build PHP CLI binaries per platform and publish them to GitHub releases.

Every directory below the build root holding a Dockerfile is a platform; the
directory name is the platform identifier. Each platform is built once per
requested version and published as the 'php' asset of release
php-<platform>-v<version>.

Unrecognized --name[=value] flags are forwarded to docker build as
--build-arg name[=value].

Usage:
  babirusa-builder 8.1 8.2
  babirusa-builder -p linux -u -r babirusa/babirusa-runtime 8.2
  babirusa-builder --WITH_OPCACHE=1 8.3"
)]
pub struct Args {
    /// Build only specific platforms (repeatable)
    #[arg(short = 'p', long = "platform", value_name = "PLATFORM")]
    pub platforms: Vec<String>,

    /// Use a specific directory for extracted artifacts
    #[arg(short = 't', long = "temp", value_name = "DIR")]
    pub temp: Option<PathBuf>,

    /// Upload builds to the GitHub repository
    #[arg(short = 'u', long)]
    pub upload: bool,

    /// GitHub repository builds are uploaded to
    #[arg(
        short = 'r',
        long,
        value_name = "OWNER/REPO",
        env = "BABIRUSA_REPOSITORY",
        default_value = DEFAULT_REPOSITORY
    )]
    pub repository: String,

    /// Directory searched for platform Dockerfiles (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Stop at the first failed platform/version instead of continuing
    #[arg(long)]
    pub fail_fast: bool,

    /// GitHub REST API endpoint
    #[arg(long, value_name = "URL", env = "BABIRUSA_GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// GitHub upload endpoint
    #[arg(long, value_name = "URL", env = "BABIRUSA_GITHUB_UPLOAD_URL", default_value = DEFAULT_UPLOAD_URL)]
    pub github_upload_url: String,

    /// Show build output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// PHP versions to build
    #[arg(required = true, value_name = "VERSION")]
    pub versions: Vec<String>,

    /// Unrecognized flags, forwarded as build arguments
    #[arg(skip)]
    pub passthrough: PassThrough,
}

impl Args {
    /// Parse the process arguments, exiting with usage on error
    pub fn parse_args() -> Self {
        let argv = std::env::args_os().map(|a| a.to_string_lossy().into_owned());
        let (recognized, passthrough) = split_passthrough(argv);
        let mut args = Self::parse_from(recognized);
        args.passthrough = passthrough;
        args
    }

    /// Parse an explicit argument vector (first element is the program name)
    pub fn try_parse_argv<I, T>(argv: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv = argv
            .into_iter()
            .map(|a| a.into().to_string_lossy().into_owned());
        let (recognized, passthrough) = split_passthrough(argv);
        let mut args = Self::try_parse_from(recognized)?;
        args.passthrough = passthrough;
        Ok(args)
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        RepoCoordinates::parse(&self.repository).map_err(|e| e.to_string())?;

        for version in &self.versions {
            if !is_tag_component(version) {
                return Err(format!(
                    "Invalid version '{}': only letters, digits, '.', '_' and '-' are allowed",
                    version
                ));
            }
        }

        for platform in &self.platforms {
            if platform.is_empty() {
                return Err("Platform filter must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Turn validated arguments into build settings
    pub fn into_settings(self) -> Result<BuildSettings> {
        self.validate()
            .map_err(|reason| CliError::InvalidArguments { reason })?;

        let repository = RepoCoordinates::parse(&self.repository)?;
        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };

        Ok(BuildSettings {
            root,
            workdir: self.temp.unwrap_or_else(std::env::temp_dir),
            platforms: self.platforms,
            versions: self.versions,
            repository,
            upload: self.upload,
            failure_policy: if self.fail_fast {
                FailurePolicy::AbortRun
            } else {
                FailurePolicy::Continue
            },
            build_args: self.passthrough,
            github_api_url: self.github_api_url,
            github_upload_url: self.github_upload_url,
        })
    }
}

/// Versions end up in docker image tags and release tags
fn is_tag_component(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Split `argv` into tokens clap understands and the pass-through bag.
///
/// An unrecognized long flag is taken as `--name` or `--name=value`; it never
/// consumes the following token, so `--foo 8.1` leaves `8.1` as a version.
/// Everything after a bare `--` is left alone.
pub fn split_passthrough<I>(argv: I) -> (Vec<String>, PassThrough)
where
    I: IntoIterator<Item = String>,
{
    let command = Args::command();
    let mut known: HashSet<String> = command
        .get_arguments()
        .filter_map(|arg| arg.get_long().map(str::to_string))
        .collect();
    known.insert("help".to_string());
    known.insert("version".to_string());

    let mut recognized = Vec::new();
    let mut passthrough = PassThrough::new();
    let mut positional_only = false;

    for token in argv {
        if positional_only || token == "--" {
            positional_only = true;
            recognized.push(token);
            continue;
        }

        let Some(flag) = token.strip_prefix("--") else {
            recognized.push(token);
            continue;
        };

        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (flag, None),
        };

        if known.contains(name) {
            recognized.push(token);
        } else {
            log::debug!("Passing through unrecognized flag --{}", name);
            passthrough.insert(name.to_string(), value);
        }
    }

    (recognized, passthrough)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_unknown_flags_collected() {
        let (recognized, passthrough) =
            split_passthrough(argv(&["babirusa-builder", "--foo=bar", "--baz", "8.1"]));

        assert_eq!(recognized, argv(&["babirusa-builder", "8.1"]));
        assert_eq!(passthrough.get("foo"), Some(&Some("bar".to_string())));
        assert_eq!(passthrough.get("baz"), Some(&None));
    }

    #[test]
    fn test_known_flags_kept() {
        let (recognized, passthrough) = split_passthrough(argv(&[
            "babirusa-builder",
            "--platform",
            "linux",
            "--repository=acme/php",
            "--upload",
            "8.2",
        ]));

        assert!(passthrough.is_empty());
        assert_eq!(recognized.len(), 6);
    }

    #[test]
    fn test_double_dash_stops_collection() {
        let (recognized, passthrough) =
            split_passthrough(argv(&["babirusa-builder", "--", "--not-a-flag"]));

        assert!(passthrough.is_empty());
        assert_eq!(recognized, argv(&["babirusa-builder", "--", "--not-a-flag"]));
    }

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_argv([
            "babirusa-builder",
            "-p",
            "linux",
            "-p",
            "darwin",
            "-u",
            "--WITH_OPCACHE=1",
            "8.1",
            "8.2",
        ])
        .unwrap();

        assert_eq!(args.platforms, vec!["linux", "darwin"]);
        assert!(args.upload);
        assert_eq!(args.versions, vec!["8.1", "8.2"]);
        assert_eq!(
            args.passthrough.get("WITH_OPCACHE"),
            Some(&Some("1".to_string()))
        );
    }

    #[test]
    fn test_versions_required() {
        assert!(Args::try_parse_argv(["babirusa-builder", "-u"]).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_version() {
        let args = Args::try_parse_argv(["babirusa-builder", "8.1 beta"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_repository() {
        let args = Args::try_parse_argv(["babirusa-builder", "-r", "no-slash", "8.1"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_fail_fast_selects_abort_policy() {
        let settings = Args::try_parse_argv([
            "babirusa-builder",
            "--fail-fast",
            "--root",
            "/tmp",
            "-t",
            "/tmp/artifacts",
            "8.1",
        ])
        .unwrap()
        .into_settings()
        .unwrap();

        assert_eq!(settings.failure_policy, FailurePolicy::AbortRun);
        assert_eq!(settings.workdir, PathBuf::from("/tmp/artifacts"));
        assert_eq!(settings.root, PathBuf::from("/tmp"));
    }
}
