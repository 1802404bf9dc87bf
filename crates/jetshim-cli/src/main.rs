//! jetshim CLI - inspect and run intercepted Jet/ACE commands.

use clap::{Parser, Subcommand};
use jetshim::connection::{
    extract_data_source, has_provider_token, is_connection_string, is_plain_file_name,
};
use jetshim::lifecycle::{lock_files, LifecycleExecutor, StorageFormat};
use jetshim::{partition, Classified, LifecycleOutcome, NoPooling, ShimConfig, ShimError, StoreEngine};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "jetshim")]
#[command(about = "Command interception for Jet/ACE desktop databases")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a command would be intercepted
    Classify {
        /// Command text
        command: String,
    },

    /// Split a script into execution batches around lifecycle commands
    Partition {
        /// Script file with statements separated by GO lines ("-" for stdin)
        #[arg(default_value = "-")]
        script: PathBuf,
    },

    /// Resolve a file name or connection string to a database path
    Resolve {
        /// File name or connection string
        target: String,

        /// Resolve as a CREATE DATABASE target (applies the default extension)
        #[arg(long)]
        create: bool,
    },

    /// Check whether a database file exists
    Exists {
        /// File name or connection string
        target: String,
    },

    /// Delete a database file and its lock files
    Drop {
        /// File name or connection string
        target: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), ShimError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(ShimError::Config)?;

    let config = match cli.config {
        Some(ref path) => {
            let config = ShimConfig::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => ShimConfig::default(),
    };

    match cli.command {
        Commands::Classify { command } => {
            let classified = jetshim::classify(&command)?;
            print_classification(&command, classified.as_ref(), cli.output_json)?;
        }

        Commands::Partition { script } => {
            let text = read_script(&script)?;
            let statements = split_statements(&text);
            let batches = partition(statements.iter().map(String::as_str));

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&batches)?);
            } else {
                for (i, batch) in batches.iter().enumerate() {
                    println!("Batch {} ({} statements)", i + 1, batch.len());
                    for statement in batch {
                        println!("  {}", statement);
                    }
                }
            }
        }

        Commands::Resolve { target, create } => {
            let executor = executor(config);
            let resolution = Resolution::new(&executor, &target, create)?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else {
                resolution.print();
            }
        }

        Commands::Exists { target } => {
            let exists = executor(config).database_exists(&target).await?;
            if cli.output_json {
                println!("{}", serde_json::json!({ "target": target, "exists": exists }));
            } else {
                println!("{}", if exists { "exists" } else { "missing" });
            }
        }

        Commands::Drop { target } => {
            let cancel = setup_signal_handler();
            let executor = executor(config);

            let result = tokio::select! {
                _ = cancel.cancelled() => Err(ShimError::Cancelled),
                result = executor.drop_database(&target) => result,
            };
            let outcome = result?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                match outcome {
                    LifecycleOutcome::NoOp(path) => {
                        println!("Nothing to drop: {} does not exist", path.display())
                    }
                    other => println!("Dropped {}", other.path().display()),
                }
            }
        }
    }

    Ok(())
}

/// Store engine for a process that can only delete databases.
struct DropOnlyEngine;

#[async_trait::async_trait]
impl StoreEngine for DropOnlyEngine {
    async fn create_database(
        &self,
        path: &Path,
        _password: Option<&str>,
        _format: StorageFormat,
    ) -> jetshim::Result<()> {
        Err(ShimError::Config(format!(
            "cannot create {}: no database engine is attached",
            path.display()
        )))
    }
}

fn executor(config: ShimConfig) -> LifecycleExecutor {
    LifecycleExecutor::new(Arc::new(NoPooling), Arc::new(DropOnlyEngine), config)
}

#[derive(Serialize)]
struct Resolution {
    target: String,
    is_connection_string: bool,
    has_provider: bool,
    is_plain_file_name: bool,
    data_source: Option<String>,
    path: PathBuf,
    format: StorageFormat,
    lock_files: Vec<PathBuf>,
}

impl Resolution {
    fn new(executor: &LifecycleExecutor, target: &str, create: bool) -> Result<Self, ShimError> {
        let path = if create {
            executor.resolve_create_path(&jetshim::connection::resolve_data_source(target))?
        } else {
            executor.resolve_target(target)?
        };

        Ok(Self {
            target: target.to_string(),
            is_connection_string: is_connection_string(target),
            has_provider: has_provider_token(target),
            is_plain_file_name: is_plain_file_name(target),
            data_source: extract_data_source(target),
            format: StorageFormat::for_path(&path),
            lock_files: lock_files(&path),
            path,
        })
    }

    fn print(&self) {
        println!("Target: {}", self.target);
        if self.is_connection_string {
            println!("  Connection string (provider: {})", if self.has_provider { "yes" } else { "no" });
            if let Some(ref ds) = self.data_source {
                println!("  Data source: {}", ds);
            }
        } else if self.is_plain_file_name {
            println!("  File name");
        } else {
            println!("  Not a valid file name");
        }
        println!("  Path: {}", self.path.display());
        println!("  Format: {:?}", self.format);
        for lock in &self.lock_files {
            println!("  Lock file: {}", lock.display());
        }
    }
}

fn print_classification(
    command: &str,
    classified: Option<&Classified>,
    json: bool,
) -> Result<(), ShimError> {
    if json {
        let value = match classified {
            Some(c) => serde_json::to_value(c)?,
            None => serde_json::json!({ "kind": "passthrough" }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match classified {
        Some(c) => {
            println!("Kind: {:?}", c.kind);
            if c.kind.is_legacy() {
                println!("  (legacy syntax)");
            }
            println!("Request: {:?}", c.request);
        }
        None => println!("Passthrough: {}", command.trim()),
    }
    Ok(())
}

fn read_script(path: &Path) -> Result<String, ShimError> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Split a script on lines consisting of `GO`, dropping blank statements.
fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in script.lines() {
        if line.trim().eq_ignore_ascii_case("go") {
            push_statement(&mut statements, &mut current);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    push_statement(&mut statements, &mut current);

    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    current.clear();
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}

/// Cancel on SIGINT or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for kind in [SignalKind::interrupt(), SignalKind::terminate()] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived signal, cancelling...");
                    token.cancel();
                });
            }
            Err(e) => warn!("Failed to install signal handler: {}", e),
        }
    }

    cancel_token
}

/// Cancel on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C, cancelling...");
            token.cancel();
        }
    });

    cancel_token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements_on_go_lines() {
        let script = "CREATE TABLE a (id int)\nGO\n\ngo\nCREATE DATABASE 'x.accdb'\n  GO  \nINSERT INTO a\nVALUES (1)\n";
        assert_eq!(
            split_statements(script),
            vec![
                "CREATE TABLE a (id int)",
                "CREATE DATABASE 'x.accdb'",
                "INSERT INTO a\nVALUES (1)",
            ]
        );
    }

    #[test]
    fn test_split_statements_without_separator() {
        assert_eq!(split_statements("SELECT 1"), vec!["SELECT 1"]);
        assert!(split_statements("\nGO\n").is_empty());
    }
}
