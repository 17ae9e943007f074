//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use eventdeck_core::{App, config, logging};

mod commands;

use commands::events::EventFields;

#[derive(Parser)]
#[command(name = "eventdeck")]
#[command(version)]
#[command(about = "Browse, publish and manage events from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with email/password or Google
    Login {
        #[arg(long, conflicts_with = "google")]
        email: Option<String>,
        /// Password; prompted for (input visible) when omitted
        #[arg(long, env = "EVENTDECK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Sign in through Google OAuth in the browser
        #[arg(long)]
        google: bool,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Password; prompted for (input visible) when omitted
        #[arg(long, env = "EVENTDECK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Whoami {
        /// Ask the server to confirm the stored token
        #[arg(long)]
        verify: bool,
    },
    /// Browse and manage events
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum EventCommands {
    /// List the catalog
    List {
        /// Category filter (All for every category)
        #[arg(long)]
        category: Option<String>,
        /// Search text, matched by the server
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one event
    Show {
        #[arg(value_name = "EVENT_ID")]
        id: String,
    },
    /// Publish a new event
    Add {
        #[command(flatten)]
        fields: EventFields,
    },
    /// Change fields of one of your events
    Update {
        #[arg(value_name = "EVENT_ID")]
        id: String,
        #[command(flatten)]
        fields: EventFields,
    },
    /// List the events you published
    Mine,
    /// Delete one of your events
    Delete {
        #[arg(value_name = "EVENT_ID")]
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print a fresh config generated from defaults
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        // Must work even when the config file is broken.
        Commands::Config { command } => config_command(&command),
        command => {
            let config = config::Config::load().context("load config")?;
            let app = App::from_config(config)?;
            app_command(&app, command).await
        }
    }
}

fn config_command(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::Generate => commands::config::generate(),
    }
}

async fn app_command(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Login {
            email,
            password,
            google,
        } => {
            if google {
                commands::auth::login_google(app).await
            } else {
                commands::auth::login_with_password(app, email, password).await
            }
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::auth::register(app, name, email, password).await,
        Commands::Logout => commands::auth::logout(app),
        Commands::Whoami { verify } => commands::auth::whoami(app, verify).await,

        Commands::Events { command } => match command {
            EventCommands::List { category, search } => {
                commands::events::list(app, category, search).await
            }
            EventCommands::Show { id } => commands::events::show(app, &id).await,
            EventCommands::Add { fields } => commands::events::add(app, fields).await,
            EventCommands::Update { id, fields } => {
                commands::events::update(app, &id, fields).await
            }
            EventCommands::Mine => commands::events::mine(app).await,
            EventCommands::Delete { id, yes } => commands::events::delete(app, &id, yes).await,
        },

        Commands::Config { command } => config_command(&command),
    }
}
