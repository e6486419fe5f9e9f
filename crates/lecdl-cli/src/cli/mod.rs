//! CLI for the lecdl lecture downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use lecdl_core::config::{self, LecdlConfig, Requirements, Settings};
use lecdl_core::pipeline::{RunOptions, TaskKind};
use std::path::PathBuf;

use commands::{run_cached, run_course, run_forget};

/// Top-level CLI for lecdl.
#[derive(Debug, Parser)]
#[command(name = "lecdl")]
#[command(about = "lecdl: download and republish recorded lectures", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Switches shared by `download` and `upload`.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Process every lecture with the full fetch limit instead of a short test run.
    #[arg(long)]
    pub full: bool,

    /// Also fetch slide images (Panopto courses only).
    #[arg(long)]
    pub process_slides: bool,

    /// Local destination for media; overrides `video_root` in the config file.
    #[arg(long, value_name = "DIR")]
    pub video_root: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch a course's lectures into the local video root.
    Download {
        /// Course page URL.
        url: String,

        #[command(flatten)]
        args: RunArgs,
    },

    /// Fetch a course's lectures and republish them to the remote store.
    Upload {
        /// Course page URL.
        url: String,

        #[command(flatten)]
        args: RunArgs,

        /// Mounted remote-store root; overrides `publish_root` in the config file.
        #[arg(long, value_name = "DIR")]
        publish_root: Option<PathBuf>,
    },

    /// Drop a course's cached metadata so the next run scrapes again.
    Forget {
        /// Course page URL.
        url: String,
    },

    /// List courses with cached metadata.
    Cached,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Download { url, args } => {
                let settings = course_settings(&mut cfg, TaskKind::Fetch, &args, None)?;
                run_course(&settings, &url, run_options(TaskKind::Fetch, &args)).await?;
            }
            CliCommand::Upload {
                url,
                args,
                publish_root,
            } => {
                let settings =
                    course_settings(&mut cfg, TaskKind::Publish, &args, publish_root)?;
                run_course(&settings, &url, run_options(TaskKind::Publish, &args)).await?;
            }
            CliCommand::Forget { url } => {
                let settings = Settings::validate(&cfg, Requirements::default())?;
                run_forget(&settings, &url).await?;
            }
            CliCommand::Cached => {
                let settings = Settings::validate(&cfg, Requirements::default())?;
                run_cached(&settings).await?;
            }
        }

        Ok(())
    }
}

/// Apply command-line overrides and validate before any network work.
fn course_settings(
    cfg: &mut LecdlConfig,
    kind: TaskKind,
    args: &RunArgs,
    publish_root: Option<PathBuf>,
) -> Result<Settings> {
    if let Some(root) = &args.video_root {
        cfg.video_root = Some(root.clone());
    }
    if let Some(root) = publish_root {
        cfg.publish_root = Some(root);
    }
    let needs = Requirements {
        publish: kind == TaskKind::Publish,
        scraper: true,
    };
    Ok(Settings::validate(cfg, needs)?)
}

fn run_options(kind: TaskKind, args: &RunArgs) -> RunOptions {
    RunOptions {
        kind,
        full: args.full,
        process_slides: args.process_slides,
    }
}

#[cfg(test)]
mod tests;
