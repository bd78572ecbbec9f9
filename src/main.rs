//! release-packages - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use dialoguer::Confirm;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use release_packages::tool::{python_program, twine_program};
use release_packages::{CommitHash, ReleaseConfig, ReleaseError, ReleaseVersion, SystemRunner, run_release};

/// Build, upload and tag the zulip, zulip_bots and zulip_botserver packages.
///
/// For example, to release version 0.4.0, run from the repository root:
///
///     release-packages 0.4.0 --build --push origin --release
///
/// which builds sdists and wheels, commits and tags the version bump, pushes
/// it, and uploads the distributions with twine.
#[derive(Parser, Debug)]
#[command(name = "release-packages")]
#[command(about = "Build, upload and tag the Zulip API packages")]
#[command(version)]
#[command(group(
    ArgGroup::new("actions")
        .required(true)
        .multiple(true)
        .args(["cleanup", "build", "release", "push", "update_zulip_main_repo"]),
))]
struct Cli {
    /// Version number of the release (e.g. 0.4.0)
    #[arg(value_name = "VERSION")]
    release_version: String,

    /// Remove build directories (dist/, build/, temp/, *.egg-info/)
    #[arg(short, long)]
    cleanup: bool,

    /// Build sdists and wheels for all packages, stored in <package>/dist/
    #[arg(short, long)]
    build: bool,

    /// Upload the packages to the package index using twine
    #[arg(short, long)]
    release: bool,

    /// Commit the version bump, tag it, and push both to this remote
    #[arg(long, value_name = "REMOTE")]
    push: Option<String>,

    /// Update requirements/* in a main Zulip repo checkout and push a branch
    #[arg(long, value_name = "PATH_TO_ZULIP_DIR")]
    update_zulip_main_repo: Option<PathBuf>,

    /// Pin the main repo to this commit instead of the release tag
    #[arg(long, value_name = "COMMIT_HASH", requires = "update_zulip_main_repo")]
    hash: Option<String>,

    /// Remote the main repo upgrade branch is pushed to
    #[arg(long, value_name = "REMOTE", default_value = "origin")]
    main_repo_remote: String,

    /// Root of the API repository
    #[arg(long, value_name = "PATH", default_value = ".")]
    repo: PathBuf,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Verbose logging (shows tool output)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let version: ReleaseVersion = cli.release_version.parse()?;
    let hash = cli
        .hash
        .as_deref()
        .map(str::parse::<CommitHash>)
        .transpose()?;

    let config = ReleaseConfig {
        repo: cli.repo,
        version,
        cleanup: cli.cleanup,
        build: cli.build,
        push: cli.push,
        release: cli.release,
        main_repo: cli.update_zulip_main_repo,
        hash,
        main_repo_remote: cli.main_repo_remote,
        python: python_program(),
        twine: twine_program(),
    };

    let skip_prompt = cli.yes;
    let result = run_release(&config, &SystemRunner, |config| {
        skip_prompt || confirm_release(config)
    });

    match result {
        Ok(()) => {
            println!();
            println!("Release {} done.", config.version);
            Ok(())
        }
        Err(ReleaseError::Cancelled) => {
            println!("Release cancelled. No changes made.");
            Ok(())
        }
        Err(e) => Err(e).context(format!("Release {} failed", config.version)),
    }
}

/// Print the summary and ask before publishing anything.
fn confirm_release(config: &ReleaseConfig) -> bool {
    println!();
    println!("Summary:");
    for line in config.summary() {
        println!("  {}", line);
    }
    println!();

    Confirm::new()
        .with_prompt("Proceed?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("release_packages=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("release_packages=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time()
                .compact(),
        )
        .init();
}
