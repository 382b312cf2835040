//! Console host for the DatAudit audit execution engine.
//!
//! Loads an audit collection from a JSON document, wires the compiled-in
//! database providers into the engine's registry, runs the collection (or a
//! single named audit) strictly sequentially, and emits every composed
//! notification through the log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use dataudit_core::{init_logging, Audit, AuditRunner, AuditState};

mod host;
mod loader;

#[derive(Parser)]
#[command(name = "dataudit-run")]
#[command(about = "Scheduled SQL data-quality audit runner")]
#[command(version)]
#[command(long_about = "
DatAudit Runner - scheduled SQL data-quality verification

Runs the audits defined in a JSON collection document against their
configured data stores, evaluates each test's row count against its
threshold, and emits a formatted alert for every failure (or report-only
test). Audits run one at a time, in file order.

SUPPORTED PROVIDERS:
- SQLite (provider id: sqlite)
- PostgreSQL (provider id: postgresql)

EXAMPLES:
  dataudit-run --audits nightly.json
  dataudit-run run nightly.json --audit orders-no-orphans
  dataudit-run list-providers
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Command>,

    /// Audit collection file
    #[arg(
        long,
        env = "DATAUDIT_FILE",
        default_value = "audits.json",
        help = "Path to the JSON audit collection document"
    )]
    audits: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Run a collection of audits
    Run(RunArgs),
    /// List compiled-in database providers
    ListProviders,
}

#[derive(Args)]
struct RunArgs {
    /// Audit collection file
    #[arg(help = "Path to the JSON audit collection document")]
    audits: Option<PathBuf>,

    /// Run only the named audit
    #[arg(long, help = "Run a single audit by name instead of the whole collection")]
    audit: Option<String>,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Some(Command::Run(args)) => {
            let path = args.audits.clone().unwrap_or_else(|| cli.audits.clone());
            run_audits(&path, args.audit.as_deref()).await
        }
        Some(Command::ListProviders) => {
            list_providers();
            Ok(())
        }
        None => run_audits(&cli.audits, None).await,
    }
}

/// Loads the collection and runs it (or one named audit from it).
async fn run_audits(path: &Path, only: Option<&str>) -> anyhow::Result<()> {
    let collection = loader::load_collection(path)?;
    info!("Loaded {} audits from {}", collection.len(), path.display());

    let registry = host::build_registry();
    let dispatcher = Arc::new(host::LogDispatcher);

    let failed = if let Some(name) = only {
        let mut audit = collection
            .find_by_name(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no audit named '{name}' in {}", path.display()))?;

        let mut runner = AuditRunner::new(registry, dispatcher);
        runner.add_observer(Arc::new(host::LogProgress));
        runner.run_audit(&mut audit).await;

        print_summary(std::iter::once(&audit))
    } else {
        let mut runner = AuditRunner::new(registry, dispatcher).with_audits(collection);
        runner.add_observer(Arc::new(host::LogProgress));
        runner.run_audits().await?;

        match runner.audits() {
            Some(audits) => print_summary(audits.iter()),
            None => 0,
        }
    };

    if failed > 0 {
        info!("{} audit(s) failed", failed);
        std::process::exit(1);
    }

    Ok(())
}

/// Prints one line per audit plus any recorded failure messages.
///
/// Returns the number of failed audits.
fn print_summary<'a>(audits: impl Iterator<Item = &'a Audit>) -> usize {
    let mut failed = 0;

    for audit in audits {
        let status = match audit.result {
            AuditState::Passed => "passed",
            AuditState::Failed => {
                failed += 1;
                "FAILED"
            }
            AuditState::NotRun => "not run",
        };

        println!("{}: {}", audit.name, status);

        for test in &audit.tests {
            if !test.test_failed_message.is_empty() {
                println!("  - {}", test.test_failed_message);
            }
        }
    }

    failed
}

/// Lists the providers compiled into this host.
fn list_providers() {
    let registry = host::build_registry();

    println!("Compiled-in database providers:");
    println!();

    for id in registry.provider_ids() {
        if let Some(provider) = registry.get(&id) {
            println!("  {:<12} {}", id, provider.engine_name());
        }
    }

    println!();
    println!("Audits select a provider with their \"provider\" field.");
}
