use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use worktrace::OutputFormat;
use worktrace::commands;
use worktrace::config;
use worktrace::session::Session;

#[derive(Parser)]
#[command(name = "wt")]
#[command(about = "Worktrace time tracking from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a timer on a project
    Start {
        #[arg(long, help = "Project ID")]
        project: u64,
        #[arg(long, help = "Optional notes")]
        notes: Option<String>,
    },
    /// Pause a running timer
    Pause {
        #[arg(help = "Timer ID (defaults to the last timer started here)")]
        id: Option<u64>,
    },
    /// Resume a paused timer
    Resume {
        #[arg(help = "Timer ID (defaults to the last timer started here)")]
        id: Option<u64>,
    },
    /// Stop a timer and log it as a time entry
    Stop {
        #[arg(help = "Timer ID (defaults to the last timer started here)")]
        id: Option<u64>,
        #[arg(long, help = "What was done (required)")]
        summary: String,
        #[arg(long, help = "Task label for the time entry")]
        task: Option<String>,
        #[arg(long, help = "Log the entry as non-billable")]
        non_billable: bool,
    },
    /// Show timers with their live elapsed time
    Status {
        #[arg(help = "Show a single timer")]
        id: Option<u64>,
        #[arg(long, help = "Show the last cached snapshot without contacting the server")]
        offline: bool,
    },
    /// Live timer board, refreshed every second
    Watch,
    /// Store an API token in the system keyring
    Login {
        #[arg(long, help = "API access token")]
        token: String,
    },
    /// Remove the stored token and cached timers
    Logout,
    /// Show configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    List,
    Get { key: String },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("WORKTRACE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let format = cli.format;

    let config = config::load().unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {:#}", e);
        config::Config::default()
    });

    match &cli.command {
        Commands::Start { project, notes } => {
            let session = Session::open(config)?;
            commands::timer::start(&session, *project, notes.clone(), format)?;
        }
        Commands::Pause { id } => {
            let session = Session::open(config)?;
            commands::timer::pause(&session, *id, format)?;
        }
        Commands::Resume { id } => {
            let session = Session::open(config)?;
            commands::timer::resume(&session, *id, format)?;
        }
        Commands::Stop {
            id,
            summary,
            task,
            non_billable,
        } => {
            let session = Session::open(config)?;
            commands::timer::stop(&session, *id, summary, task.clone(), !non_billable, format)?;
        }
        Commands::Status { id, offline } => {
            let session = Session::open(config)?;
            commands::timer::status(&session, *id, *offline, format)?;
        }
        Commands::Watch => {
            let session = Session::open(config)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(commands::timer::watch(&session, format));
            // a fetch still blocked on the network must not hold up exit
            runtime.shutdown_background();
            result?;
        }
        Commands::Login { token } => commands::auth::login(&config, token)?,
        Commands::Logout => commands::auth::logout(&config)?,
        Commands::Config(args) => match &args.action {
            ConfigAction::List => commands::config::list(&config)?,
            ConfigAction::Get { key } => commands::config::get(key, &config)?,
        },
    }

    Ok(())
}
