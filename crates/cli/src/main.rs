mod args;
mod config;
mod json;
mod path;
mod text;

use std::env;
use std::fs;

use anyhow::{Context, Result};
use parity_audit_core::{
    DiscoveredManifests, discover_manifest_text, generate_parity_report_with_stats,
};
use tracing_subscriber::EnvFilter;

use crate::args::{OutputFormat, ParsedArgs, parse_args, print_help};
use crate::config::{ManifestSource, ResolvedRun, resolve_run};
use crate::json::{JsonScanStats, map_report, write_json};
use crate::text::{
    format_cleanup_script, format_markdown_report, format_scan_stats, format_text_report,
};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let parsed = match parse_args(&args) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_help();
            return;
        }
        Err(message) => {
            eprintln!("Error: {message}\n");
            print_help();
            std::process::exit(2);
        }
    };

    if parsed.version {
        println!("parity-audit {}", env!("CARGO_PKG_VERSION"));
        return;
    }
    if parsed.config.is_none() && (parsed.reference.is_none() || parsed.candidate.is_none()) {
        eprintln!("Error: both a reference and a candidate root are required\n");
        print_help();
        std::process::exit(2);
    }

    init_tracing(parsed.verbose);

    match run(&parsed) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn load_manifest(resolved: &ResolvedRun) -> Result<DiscoveredManifests> {
    match &resolved.manifest {
        ManifestSource::None => Ok(DiscoveredManifests::default()),
        ManifestSource::File(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read manifest: {}", path.display()))?;
            Ok(DiscoveredManifests {
                text: Some(text),
                warnings: Vec::new(),
            })
        }
        ManifestSource::Discover { names } => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let candidate = &resolved.input.candidate;
            let discovered = discover_manifest_text(
                &candidate.root,
                &names,
                &candidate.exclude_dirs,
                resolved.options.respect_gitignore,
                resolved.options.max_file_size,
            );
            if discovered.text.is_none() {
                tracing::warn!(
                    root = %candidate.root.display(),
                    "no readable build manifest found; build status stays unknown"
                );
            }
            Ok(discovered)
        }
    }
}

fn run(parsed: &ParsedArgs) -> Result<i32> {
    let mut resolved = resolve_run(parsed)?;
    let discovered = load_manifest(&resolved)?;
    resolved.input.manifest = discovered.text;
    resolved.input.manifest_warnings = discovered.warnings;

    let outcome = generate_parity_report_with_stats(&resolved.input, &resolved.options)?;
    let report = outcome.result;
    let stats = outcome.stats;

    let below_minimum = resolved
        .min_coverage
        .filter(|min| report.coverage_below(*min));
    let critical = resolved.fail_on_critical && report.is_critical();

    let report = map_report(report);
    match parsed.format {
        OutputFormat::Json => {
            if parsed.stats {
                write_json(&serde_json::json!({
                    "report": &report,
                    "scanStats": JsonScanStats::from(stats.clone()),
                }))?;
            } else {
                write_json(&report)?;
            }
        }
        OutputFormat::Markdown => print!("{}", format_markdown_report(&report)),
        OutputFormat::Text => print!("{}", format_text_report(&report)),
    }
    if parsed.stats && parsed.format != OutputFormat::Json {
        eprint!("{}", format_scan_stats(&stats));
    }

    if let Some(path) = &parsed.cleanup_script {
        fs::write(path, format_cleanup_script(&report.duplicate_groups))
            .with_context(|| format!("failed to write cleanup script: {}", path.display()))?;
        tracing::info!(path = %path.display(), "cleanup script written");
    }

    let mut exit_code = 0;
    if let Some(min) = below_minimum {
        eprintln!(
            "coverage {:.1}% is below the required {min:.1}%",
            report.summary.coverage_percent
        );
        exit_code = 1;
    }
    if critical {
        eprintln!(
            "{} critical duplicate group(s) found",
            report.summary.critical_groups
        );
        exit_code = 1;
    }
    Ok(exit_code)
}
