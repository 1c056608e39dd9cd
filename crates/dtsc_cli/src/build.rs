//! `dtsc build`: incremental declaration generation.
//!
//! 1. Find the project root and load `dtsc.toml`
//! 2. Merge command-line entrypoints and outdir over the config
//! 3. Run one cache engine build against the configured bundler command
//! 4. Print a summary line

use dtsc_cache::{BuildOutcome, BuildReport, BuildRequest, CacheEngine, CommandBundler};
use dtsc_config::{resolve_build, BuildOverrides};

use crate::pipeline::load_project;
use crate::{BuildArgs, GlobalArgs};

/// Runs the `dtsc build` command.
///
/// Returns exit code 0 on success. Bundler failures and output write failures
/// are returned as errors.
pub async fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project(global)?;

    let overrides = BuildOverrides {
        entrypoints: args.entries.clone(),
        outdir: args.outdir.clone(),
        no_cache: args.no_cache,
    };
    let resolved = resolve_build(&config, &root, &overrides)?;

    let bundler = CommandBundler::from_argv(&resolved.bundler_command)
        .ok_or("no bundler configured: set `bundler.command` in dtsc.toml")?
        .current_dir(&resolved.root);

    if !global.quiet {
        eprintln!(
            "   Building {} entrypoint(s) into {}",
            resolved.entrypoints.len(),
            resolved.outdir.display()
        );
    }

    let mut engine = CacheEngine::new(&resolved.options, &resolved.root);
    let request = BuildRequest {
        entrypoints: resolved.entrypoints,
        outdir: resolved.outdir,
    };
    let report = engine.build(&bundler, &request).await?;

    if !global.quiet {
        eprintln!("   {}", summary(&report));
    }
    Ok(0)
}

/// Renders the one-line build summary.
fn summary(report: &BuildReport) -> String {
    let mut line = match report.outcome {
        BuildOutcome::NoWork => format!("Up to date ({} cached)", report.reused.len()),
        BuildOutcome::Generated => format!(
            "Generated {} declaration(s), {} cached",
            report.regenerated.len(),
            report.reused.len()
        ),
    };
    if !report.pruned.is_empty() {
        line.push_str(&format!(", {} pruned", report.pruned.len()));
    }
    if !report.evicted.is_empty() {
        line.push_str(&format!(", {} evicted", report.evicted.len()));
    }
    line
}
