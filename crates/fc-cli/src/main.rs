use anyhow::Context;
use clap::{Parser, Subcommand};
use fc_core::{ChainId, Config, Grammar, Policy};
use fc_xt::{BackendRegistry, Executor, Plan, Reconciler, discover_all};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fwchain")]
#[command(version, about = "Declarative iptables/ip6tables/ebtables chain management", long_about = None)]
struct Cli {
    /// Chain configuration file
    #[arg(short, long, global = true, default_value = "fwchain.yaml")]
    file: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every chain the backends currently report
    List {
        #[arg(long)]
        json: bool,
    },
    /// Validate a chain name and print its canonical form
    Check {
        name: String,
        /// Use the built-in chain grammar
        #[arg(long)]
        builtin: bool,
    },
    /// Show the changes needed to converge
    Plan {
        #[arg(long)]
        json: bool,
    },
    /// Converge chains to the configuration
    Apply {
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::List { json } => list_chains(&cli.file, json)?,
        Commands::Check { name, builtin } => check_name(&name, builtin)?,
        Commands::Plan { json } => {
            let (_, plan) = build_plan(&cli.file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                plan.display();
            }
        }
        Commands::Apply { dry_run } => apply(&cli.file, dry_run)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `list` works without a config file; backend paths then use their defaults.
fn load_config(path: &Path, required: bool) -> anyhow::Result<Config> {
    if !required && !path.exists() {
        return Ok(Config::default());
    }
    Config::from_file(path)
}

fn list_chains(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(path, false)?;
    let registry = BackendRegistry::from_paths(&config.backends);
    let snapshot = discover_all(&registry).context("Failed to read current chains")?;

    if json {
        println!("{}", serde_json::to_string_pretty(snapshot.records())?);
        return Ok(());
    }

    println!("Chains ({}):", snapshot.records().len());
    for record in snapshot.records() {
        println!("  • {:<40} {}", record.name(), record.policy);
    }
    Ok(())
}

fn check_name(name: &str, builtin: bool) -> anyhow::Result<()> {
    let grammar = if builtin {
        Grammar::BuiltIn
    } else {
        Grammar::General
    };
    let id = ChainId::parse(name, grammar)?;

    println!("✅ {}", id);
    println!("   table:    {}", id.table());
    println!("   chain:    {}", id.chain());
    println!("   protocol: {}", id.family());
    Ok(())
}

fn build_plan(path: &Path) -> anyhow::Result<(BackendRegistry, Plan)> {
    let config = load_config(path, true)?;
    let desired = config.desired_chains()?;
    let registry = BackendRegistry::from_paths(&config.backends);

    info!(path = %path.display(), chains = desired.len(), "loaded configuration");

    let snapshot = discover_all(&registry).context("Failed to read current chains")?;
    let resolved = snapshot.prefetch(&desired);
    for entry in &resolved {
        if entry.state.policy() == Some(Policy::Inconsistent) {
            warn!(chain = %entry.desired.id, "IPv4 and IPv6 policies disagree");
        }
    }

    let plan = Plan::from_resolved(&resolved);
    info!(actions = plan.actions.len(), "plan computed");
    Ok((registry, plan))
}

fn apply(path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let (registry, plan) = build_plan(path)?;
    plan.display();
    if plan.is_empty() {
        return Ok(());
    }

    let executor = Executor::new(Reconciler::new(&registry), dry_run);
    let applied = executor.execute(&plan).context("Apply failed")?;

    if dry_run {
        println!("\n[DRY RUN] {} actions not applied", applied);
    } else {
        println!("\n✅ Applied {} actions", applied);
    }
    Ok(())
}
