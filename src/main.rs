use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use credlock::commands::{credential, init, password, run, session, status};
use credlock::completions::{generate_completions, Shell};
use credlock::config::Config;
use credlock::validation::clap_name_validator;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "credlock")]
#[command(about = "Hand out exclusive credential session groups to concurrent runs", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./credlock.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalogue document, overriding the config
    #[arg(long, global = true)]
    catalogue: Option<PathBuf>,

    /// Lock directory, overriding the config
    #[arg(long, global = true)]
    lock_dir: Option<PathBuf>,

    /// Run state file of this execution, overriding the config
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty catalogue
    Init,

    /// Manage session groups
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Manage credential systems
    Credential {
        #[command(subcommand)]
        command: CredentialCommands,
    },

    /// Manage stored passwords
    Password {
        #[command(subcommand)]
        command: PasswordCommands,
    },

    /// Take a free session group for this execution (or the one it already holds)
    Acquire,

    /// Give back the session group held by this execution
    Release {
        /// Remove every lock in the lock directory instead
        #[arg(long)]
        all: bool,
    },

    /// Record the signed-on state of a credential system for this execution
    Sign {
        #[command(subcommand)]
        command: SignCommands,
    },

    /// Show session groups, held locks and the current run
    Status,

    /// Generate shell completions
    Completions {
        /// bash, zsh, fish or powershell
        shell: String,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Add a session group with every credential system unset
    Add {
        #[arg(value_parser = clap_name_validator)]
        name: String,
    },
    /// Delete a session group
    Delete { name: String },
    /// Rename a session group
    Rename {
        from: String,
        #[arg(value_parser = clap_name_validator)]
        to: String,
    },
    /// Assign a user to a credential system of a session group
    Set {
        session: String,
        #[arg(long)]
        credential: String,
        #[arg(long)]
        user: String,
        /// Also store this user's password
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum CredentialCommands {
    /// Register a credential system in every session group
    Add {
        system: String,
        /// Common setting as key:value (repeatable)
        #[arg(long = "setting", value_parser = credential::parse_setting)]
        settings: Vec<(String, String)>,
        /// User assigned in every session group (default: unset)
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value = "")]
        password: String,
    },
    /// Remove a credential system everywhere
    Delete { system: String },
    /// Rename a credential system everywhere
    Rename { from: String, to: String },
}

#[derive(Subcommand)]
enum PasswordCommands {
    /// Encrypt and store a user's password
    Set {
        #[arg(long)]
        credential: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SignCommands {
    /// Mark the credential system as signed on
    On { system: String },
    /// Mark the credential system as signed off
    Off { system: String },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "credlock=debug" } else { "credlock=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let (mut config, _) = Config::discover(cli.config.as_deref())?;
    if let Some(path) = &cli.catalogue {
        config.catalogue = path.clone();
    }
    if let Some(path) = &cli.lock_dir {
        config.lock_dir = path.clone();
    }
    if let Some(path) = &cli.state_file {
        config.state_file = path.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        let shell = Shell::from_str(shell)?;
        let mut cmd = Cli::command();
        generate_completions(&mut cmd, shell, &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    match cli.command {
        Commands::Init => init::execute(&config),
        Commands::Session { command } => match command {
            SessionCommands::Add { name } => session::add(&config, name),
            SessionCommands::Delete { name } => session::delete(&config, name),
            SessionCommands::Rename { from, to } => session::rename(&config, from, to),
            SessionCommands::Set {
                session: name,
                credential,
                user,
                password,
            } => session::set(&config, name, credential, user, password),
        },
        Commands::Credential { command } => match command {
            CredentialCommands::Add {
                system,
                settings,
                user,
                password,
            } => credential::add(&config, system, settings, user, password),
            CredentialCommands::Delete { system } => credential::delete(&config, system),
            CredentialCommands::Rename { from, to } => credential::rename(&config, from, to),
        },
        Commands::Password { command } => match command {
            PasswordCommands::Set {
                credential,
                user,
                password: secret,
            } => password::set(&config, credential, user, secret),
        },
        Commands::Acquire => run::acquire(&config),
        Commands::Release { all } => run::release(&config, all),
        Commands::Sign { command } => match command {
            SignCommands::On { system } => run::sign(&config, system, true),
            SignCommands::Off { system } => run::sign(&config, system, false),
        },
        Commands::Status => status::execute(&config),
        Commands::Completions { .. } => Ok(()),
    }
}
