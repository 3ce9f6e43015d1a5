use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "mindfulblock", version, about = "MindfulBlock: block distracting sites, with friction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blocking rules
    Rule {
        #[command(subcommand)]
        action: commands::rule::RuleAction,
    },
    /// Rule groups
    Group {
        #[command(subcommand)]
        action: commands::group::GroupAction,
    },
    /// Built-in rule presets
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },
    /// Show what would happen to a navigation
    Check(commands::check::CheckArgs),
    /// Navigate to a URL, solving the challenge if it is blocked
    Navigate(commands::check::NavigateArgs),
    /// Temporary overrides
    Override {
        #[command(subcommand)]
        action: commands::overrides::OverrideAction,
    },
    /// Write the rules to the hosts file
    Apply,
    /// Remove MindfulBlock entries from the hosts file
    Clean,
    /// Daily block/override statistics
    Stats(commands::stats::StatsArgs),
    /// Run the companion endpoint for the browser extension
    Serve(commands::serve::ServeArgs),
    /// Talk to a companion endpoint as the extension does
    Extension {
        #[command(subcommand)]
        action: commands::extension::ExtensionAction,
    },
    /// Sync and enforcement status
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("MINDFULBLOCK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.command {
        Commands::Serve(_) => "info",
        _ => "warn",
    };
    init_tracing(level);

    let result = match cli.command {
        Commands::Rule { action } => commands::rule::run(action),
        Commands::Group { action } => commands::group::run(action),
        Commands::Preset { action } => commands::preset::run(action),
        Commands::Check(args) => commands::check::run_check(args),
        Commands::Navigate(args) => commands::check::run_navigate(args),
        Commands::Override { action } => commands::overrides::run(action),
        Commands::Apply => commands::enforce::run_apply(),
        Commands::Clean => commands::enforce::run_clean(),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Serve(args) => commands::serve::run(args),
        Commands::Extension { action } => commands::extension::run(action),
        Commands::Sync { action } => commands::sync::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
