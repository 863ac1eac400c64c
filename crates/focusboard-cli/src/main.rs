use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusboard", version, about = "FocusBoard CLI")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Google Calendar synchronization
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Kanban task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Local calendar events
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Google Calendar credentials
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("FOCUSBOARD_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let out = commands::Output::new(cli.json);
    let result = match cli.command {
        Commands::Sync { action } => commands::sync::run(action, out).await,
        Commands::Task { action } => commands::task::run(action, out),
        Commands::Event { action } => commands::event::run(action, out).await,
        Commands::Config { action } => commands::config::run(action, out),
        Commands::Auth { action } => commands::auth::run(action, out),
    };

    if let Err(e) = result {
        eprintln!("error [{}]: {e}", e.status_code());
        std::process::exit(1);
    }
}
