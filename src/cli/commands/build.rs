//! Build command: discover platforms, build every version, publish.

use crate::BuildSettings;
use crate::build::{DockerEngine, Orchestrator, PairOutcome, RunSummary, check_docker_available};
use crate::cli::{Args, OutputManager, credentials};
use crate::discovery::{PlatformFilter, discover_targets};
use crate::error::Result;
use crate::github::{GitHubStore, ReleaseReconciler};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

/// Execute the build command
pub(crate) async fn execute_build(args: Args, output: &OutputManager) -> Result<i32> {
    let settings = args.into_settings()?;

    // Credentials are resolved before any build starts and held for the run
    let store = if settings.upload {
        let token = credentials::resolve_token()?;
        Some(GitHubStore::with_endpoints(
            token,
            &settings.github_api_url,
            &settings.github_upload_url,
        )?)
    } else {
        None
    };

    check_docker_available().await?;

    let filter = PlatformFilter::new(settings.platforms.iter().cloned());
    let targets = discover_targets(&settings.root, filter)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, stopping after cleanup");
            interrupt.cancel();
        }
    });

    output.println(&format!(
        "Building PHP {} from {}",
        settings.versions.join(", "),
        settings.root.display()
    ));
    if settings.upload {
        output.println(&format!("Publishing to {}", settings.repository));
    }

    let engine = DockerEngine::new(output.clone());
    let reconciler = store
        .as_ref()
        .map(|store| ReleaseReconciler::new(store, &settings.repository, output));

    let summary = Orchestrator::new(&engine, reconciler, settings.workdir.clone(), output)
        .with_build_args(settings.build_args.clone())
        .with_cancellation(cancel)
        .run(targets, &settings.versions, settings.failure_policy)
        .await;

    print_summary(&summary, &settings, output);
    Ok(summary.exit_code())
}

fn print_summary(summary: &RunSummary, settings: &BuildSettings, output: &OutputManager) {
    output.section("Summary");

    if summary.reports.is_empty() && !summary.interrupted {
        output.warn(&format!(
            "No build targets found under {}",
            settings.root.display()
        ));
    }

    let built: BTreeSet<&str> = summary.reports.iter().map(|r| r.platform.as_str()).collect();
    for platform in &settings.platforms {
        if !built.contains(platform.as_str()) && !summary.interrupted {
            output.warn(&format!("Requested platform '{}' was not found", platform));
        }
    }

    for report in &summary.reports {
        match &report.result {
            Ok(PairOutcome::Published {
                asset_id,
                created_release,
            }) => output.success(&format!(
                "{}: published asset {}{}",
                report.tag,
                asset_id,
                if *created_release { " (new release)" } else { "" }
            )),
            Ok(PairOutcome::Verified) => output.success(&format!("{}: built", report.tag)),
            Ok(PairOutcome::Reported { stage, reason }) => output.error(&format!(
                "{}: asset {:?} failed: {}",
                report.tag, stage, reason
            )),
            Err(e) => output.error(&format!("{}: {}", report.tag, e)),
        }
    }

    let failures = summary.failures();
    if failures == 0 && !summary.interrupted {
        output.success(&format!("{} build(s) completed", summary.reports.len()));
    } else {
        output.error(&format!(
            "{} of {} build(s) failed{}",
            failures,
            summary.reports.len(),
            if summary.interrupted { " (interrupted)" } else { "" }
        ));
    }
}
