mod backend;
mod generate;
mod history;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tutr_app::AppConfig;
use tutr_core::{BackendMode, RangePreset};
use tutr_db::Store;

#[derive(Parser)]
#[command(name = "tutr", about = "Study plans from your tutoring chats")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a study plan from the chats in a date range.
    Generate(GenerateArgs),
    /// Saved study plans.
    Plans {
        #[command(subcommand)]
        command: PlansCommand,
    },
    /// Chat history used as generation input.
    Chats {
        #[command(subcommand)]
        command: ChatsCommand,
    },
    /// The config file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(clap::Args)]
pub struct GenerateArgs {
    /// First day, `YYYY-MM-DD` (UTC).
    #[arg(long, requires = "to", conflicts_with = "last")]
    pub from: Option<String>,
    /// Last day, inclusive.
    #[arg(long, requires = "from")]
    pub to: Option<String>,
    /// Quick range ending today. Defaults to `week`.
    #[arg(long, value_enum)]
    pub last: Option<LastArg>,
    /// Override the configured backend.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
    /// Save the plan once it completes.
    #[arg(long)]
    pub save: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LastArg {
    Week,
    Fortnight,
    Month,
}

impl From<LastArg> for RangePreset {
    fn from(arg: LastArg) -> Self {
        match arg {
            LastArg::Week => RangePreset::Week,
            LastArg::Fortnight => RangePreset::Fortnight,
            LastArg::Month => RangePreset::Month,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Local,
    Remote,
}

impl From<ModeArg> for BackendMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Local => BackendMode::Local,
            ModeArg::Remote => BackendMode::Remote,
        }
    }
}

#[derive(Subcommand)]
enum PlansCommand {
    /// List saved plans, newest first.
    List,
    /// Print one plan.
    Show { id: i64 },
}

#[derive(Subcommand)]
enum ChatsCommand {
    /// Import chats from a JSON file.
    Import { file: std::path::PathBuf },
    /// List stored chats.
    List,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default config file if none exists.
    Init,
    /// Print the effective config.
    Show,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();
    init_tracing();

    match cli.command {
        Command::Generate(args) => {
            let config = tutr_app::load_config()?;
            let mut store = open_store()?;
            generate::run(&config, &mut store, args).await
        }
        Command::Plans { command } => {
            let mut store = open_store()?;
            match command {
                PlansCommand::List => history::list_plans(&mut store),
                PlansCommand::Show { id } => history::show_plan(&mut store, id),
            }
        }
        Command::Chats { command } => {
            let mut store = open_store()?;
            match command {
                ChatsCommand::Import { file } => history::import_chats(&mut store, &file),
                ChatsCommand::List => history::list_chats(&mut store),
            }
        }
        Command::Config { command } => match command {
            ConfigCommand::Init => init_config(),
            ConfigCommand::Show => {
                print!("{}", tutr_app::load_config()?.to_toml()?);
                Ok(())
            }
        },
    }
}

fn open_store() -> Result<Store, Box<dyn std::error::Error>> {
    let path = tutr_app::database_path()?;
    Ok(Store::open(&path)?)
}

fn init_config() -> Result<(), Box<dyn std::error::Error>> {
    let path = tutr_app::config_path()?;
    if path.exists() {
        eprintln!("config already exists at {}", path.display());
        return Ok(());
    }
    AppConfig::default().save(&path)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
