use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use linksync_core::index::{FileSymbols, TypeSymbol};
use linksync_core::{Config, ProjectIndex, Scenario, ScenarioRunner, SymbolIndex};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "linksync")]
#[command(about = "Keep a test results tree and the editor in step", long_about = None)]
struct Cli {
    /// Config file to use instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the declarations a project's tests map to
    Symbols {
        /// Project root
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Replay link scenarios against a project
    Replay {
        /// Scenario files (YAML)
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
        /// Project root used when a scenario has no inline sources
        #[arg(long, default_value = ".")]
        project: PathBuf,
        /// Print step reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("Failed to load {}", path.display()))?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Symbols { dir, json } => symbols(&dir, &config, json),
        Commands::Replay {
            scenarios,
            project,
            json,
        } => replay(&scenarios, project, config, json),
        Commands::Config { default } => {
            if default {
                print!("{}", Config::default_config_string());
            } else {
                print!("{}", config.to_toml_string()?);
            }
            Ok(())
        }
    }
}

fn symbols(dir: &Path, config: &Config, json: bool) -> Result<()> {
    let (index, stats) = ProjectIndex::from_dir(dir, &config.index)?;
    let mut files: Vec<&FileSymbols> = index.files().collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));

    if json {
        let out = serde_json::json!({ "stats": stats, "files": files });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for file in &files {
        println!("{}", file.path().display());
        for ty in &file.types {
            print_type(file, ty, 1);
        }
        for warning in &file.warnings {
            println!("  ! {}", warning);
        }
    }
    println!();
    println!(
        "{} files, {} types, {} methods ({} skipped)",
        stats.files, stats.types, stats.methods, stats.skipped
    );
    Ok(())
}

fn print_type(file: &FileSymbols, ty: &TypeSymbol, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{}{:?} {} :{}",
        indent,
        ty.kind,
        ty.qualified_name,
        file.line_of(ty.name_range.start)
    );
    for member in &ty.members {
        println!(
            "{}  {:?} {} :{}",
            indent,
            member.kind,
            member.name,
            file.line_of(member.name_range.start)
        );
    }
    for nested in &ty.nested {
        print_type(file, nested, depth + 1);
    }
}

fn replay(paths: &[PathBuf], project: PathBuf, config: Config, json: bool) -> Result<()> {
    let runner = ScenarioRunner::new(project, config);
    let mut failed = 0;

    for path in paths {
        let result = Scenario::from_file(path).and_then(|scenario| runner.run(&scenario));
        match result {
            Ok(report) if json => println!("{}", serde_json::to_string_pretty(&report)?),
            Ok(report) => {
                println!(
                    "ok   {} ({} steps, {} checks, {})",
                    if report.name.is_empty() {
                        path.display().to_string()
                    } else {
                        report.name.clone()
                    },
                    report.steps.len(),
                    report.expectations,
                    report.view.tooltip
                );
                for step in &report.steps {
                    tracing::debug!(step = step.step, action = %step.action, status = %step.status, "replayed");
                }
            }
            Err(e) => {
                failed += 1;
                println!("FAIL {}: {}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(eyre!("{} of {} scenarios failed", failed, paths.len()));
    }
    Ok(())
}
