//! Command-line checker for logback-style configuration files
//!
//! Runs a document through the configurator and prints the resulting logger tree
//! together with every diagnostic the session recorded.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use octofhir_joran::{ConfigurationReport, ConfiguratorOptions, JoranConfigurator, LoggerContext};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "joran")]
#[command(about = "Check logback-style XML configuration files")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpret a configuration file and report what it configured
    Check {
        /// Configuration file to interpret
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Print every status message, not only warnings and errors
        #[arg(long)]
        debug: bool,
        /// Define a substitution property (key=value); may be repeated
        #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_definition)]
        define: Vec<(String, String)>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn parse_definition(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            file,
            format,
            debug,
            define,
        } => {
            let filter = if debug { "debug" } else { "warn" };
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
                .init();
            match handle_check(&file, format, debug, define) {
                Ok(has_errors) => process::exit(i32::from(has_errors)),
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    process::exit(2);
                }
            }
        }
    }
}

/// Returns whether the session recorded any error
fn handle_check(
    file: &Path,
    format: Format,
    debug: bool,
    define: Vec<(String, String)>,
) -> anyhow::Result<bool> {
    let options = define
        .into_iter()
        .fold(ConfiguratorOptions::new().with_debug(debug), |options, (key, value)| {
            options.with_property(key, value)
        });
    let context_name = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".to_string());
    let configurator =
        JoranConfigurator::new(LoggerContext::shared(context_name)).with_options(options);

    let report = configurator
        .configure_file(file)
        .with_context(|| format!("cannot check {}", file.display()))?;

    match format {
        Format::Text => print_text(&report),
        Format::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("cannot serialize the report")?;
            println!("{json}");
        }
    }

    Ok(report.has_errors())
}

fn print_text(report: &ConfigurationReport) {
    println!("Context: {}", report.context_name());
    println!("Loggers:");
    for logger in report.loggers() {
        let level = logger
            .level
            .map(|level| level.to_string())
            .unwrap_or_else(|| format!("inherited ({})", logger.effective_level));
        let mut line = format!("  {} level={level}", logger.name);
        if !logger.additive {
            line.push_str(" additive=false");
        }
        if !logger.appenders.is_empty() {
            line.push_str(&format!(" appenders=[{}]", logger.appenders.join(", ")));
        }
        println!("{line}");
    }

    let shown: Vec<_> = if report.is_debug() {
        report.diagnostics().iter().collect()
    } else {
        report
            .diagnostics_at_least(octofhir_joran::Severity::Warning)
            .collect()
    };
    if shown.is_empty() {
        println!("No problems found");
    } else {
        println!("Diagnostics:");
        for diagnostic in shown {
            println!("  {diagnostic}");
        }
    }
}
