use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_sample_check::approval::ApprovalStore;
use doc_sample_check::config::DEFAULT_CONFIG_FILE;
use doc_sample_check::{reporting, LanguageRegistry, RunOptions, SampleChecker};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Parser, Debug)]
#[command(name = "doc-sample-check", version)]
#[command(about = "Extract, validate and run the code samples in SDK documentation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every sample of one language
    Run {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Documentation root
        #[arg(long)]
        docs: PathBuf,
        #[arg(long)]
        language: String,
        /// Validate and transform only; never launch a process
        #[arg(long = "static")]
        static_only: bool,
        /// Samples executed concurrently
        #[arg(long)]
        jobs: Option<usize>,
        /// Where the JSON and Markdown reports are written
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Approve a configuration for code execution
    Allow {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// Revoke approval of a configuration
    Deny {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// List approved configurations and the languages a configuration enables
    List {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match handle(cli.command) {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit(1);
        }
    }
}

/// Returns whether the command succeeded.
fn handle(command: Command) -> Result<bool> {
    match command {
        Command::Run {
            config,
            docs,
            language,
            static_only,
            jobs,
            output_dir,
        } => {
            let options = RunOptions {
                static_only,
                jobs,
                ..RunOptions::new(docs, language)
            };
            run(&config, &options, output_dir.as_deref())
        }
        Command::Allow { config } => {
            ApprovalStore::locate()?.approve(&config)?;
            println!("Approved {}", config.display());
            Ok(true)
        }
        Command::Deny { config } => {
            ApprovalStore::locate()?.deny(&config)?;
            println!("Denied {}", config.display());
            Ok(true)
        }
        Command::List { config } => {
            let store = ApprovalStore::locate()?;
            let approved = store.list()?;
            if approved.is_empty() {
                println!("No approved configurations ({})", store.dir().display());
            }
            for path in approved {
                println!("{}", path);
            }
            if let Some(config) = config {
                let checker = SampleChecker::from_config_file(&config)?;
                let registry = LanguageRegistry::from_config(checker.config());
                println!("Languages: {}", registry.names().join(", "));
            }
            Ok(true)
        }
    }
}

fn run(config: &Path, options: &RunOptions, output_dir: Option<&Path>) -> Result<bool> {
    let checker = SampleChecker::from_config_file(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let report = runtime.block_on(checker.run(options))?;

    reporting::report_failed_samples(&report);
    reporting::print_run_statistics(&report);

    if let Some(dir) = output_dir {
        let json = reporting::write_json(&report, dir)?;
        let markdown = reporting::write_markdown(&report, dir)?;
        log::info!("Wrote {} and {}", json.display(), markdown.display());
    }

    Ok(report.is_success())
}
