//! xsd-polish CLI - schema post-processor

use clap::Parser;
use glob::glob;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use xsd_polish::{process, RuleConfig};

#[derive(Parser)]
#[command(name = "xsd-polish")]
#[command(about = "Post-process UML-generated XML schemas for publication")]
#[command(version)]
struct Cli {
    /// Rule configuration files, one per schema (supports globs)
    #[arg(required = true)]
    configs: Vec<String>,

    /// Directory the configured EA/release paths resolve against
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let configs = expand_files(&cli.configs)?;
    if cli.verbose {
        eprintln!("Processing {} configuration(s)", configs.len());
    }

    // Each schema file is processed independently; a failure in one never
    // blocks the rest.
    let mut all_ok = true;
    for config_path in &configs {
        if let Err(e) = run_one(Path::new(config_path), &cli) {
            eprintln!("Error processing {}: {}", config_path, e);
            all_ok = false;
        }
    }

    Ok(all_ok)
}

fn run_one(config_path: &Path, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    // A fresh configuration per schema file; nothing is shared between runs.
    let config = RuleConfig::load(config_path)?;
    let outcome = process(&config, &cli.base_dir)?;

    for message in outcome.report.messages() {
        println!("{}", message);
    }

    match (&outcome.output, &outcome.skipped) {
        (Some(path), _) => {
            if cli.verbose {
                eprintln!("{}: wrote {}", config_path.display(), path.display());
            }
        }
        (None, Some(reason)) => {
            println!("{}: skipped, {}", config.schema.name, reason);
        }
        (None, None) => {}
    }

    Ok(())
}

fn expand_files(patterns: &[String]) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') {
            for entry in glob(pattern)? {
                files.push(entry?.to_string_lossy().to_string());
            }
        } else {
            files.push(pattern.clone());
        }
    }

    Ok(files)
}
