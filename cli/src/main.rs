mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    ImportKind, cmd_activity_levels, cmd_chart, cmd_eat, cmd_food_add, cmd_food_list, cmd_import,
    cmd_login, cmd_profile_save, cmd_profile_show,
};
use crate::config::Config;
use bodyledger_core::models::ProfileForm;
use bodyledger_core::service::HealthService;

#[derive(Parser)]
#[command(
    name = "bodyledger",
    version,
    about = "Track body metrics and daily calories against your TDEE"
)]
struct Cli {
    /// Data directory (default: $BODYLEDGER_DATA_DIR or the platform data dir)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a user's current profile and the last 7 days
    Login {
        /// User name
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save or show body metrics
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Record units of a catalog food for a user
    Eat {
        /// User name
        user: String,
        /// Food name, exactly as in the catalog
        food: String,
        /// Number of units
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=100))]
        quantity: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show calorie intake vs TDEE for the 7 days ending today
    Chart {
        /// User name
        user: String,
        /// Last day of the window (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        until: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the food catalog
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Import CSV logs
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Save a new profile snapshot
    Save {
        /// User name
        user: String,
        /// male, female or other
        #[arg(long)]
        sex: String,
        /// Birth date (YYYY-MM-DD or D:Mon:YYYY)
        #[arg(long)]
        birth_date: String,
        /// Height in --height-unit
        #[arg(long)]
        height: f64,
        /// cm or ft
        #[arg(long, default_value = "cm")]
        height_unit: String,
        /// Weight in --weight-unit
        #[arg(long)]
        weight: f64,
        /// kg or lbs
        #[arg(long, default_value = "kg")]
        weight_unit: String,
        /// sedentary, light, moderate, active or very_active
        #[arg(long, default_value = "sedentary")]
        activity: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the latest profile
    Show {
        /// User name
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List activity levels and their TDEE multipliers
    Levels {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a food, or change the calories of an existing one
    Add {
        /// Food name
        name: String,
        /// Calories per unit
        calories: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the catalog in insertion order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import a food catalog (`food,cal`)
    Catalog {
        /// Path to the CSV file
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a profile log (`time,name,sex,bd,height,weight,...`)
    Profiles {
        /// Path to the CSV file
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import an intake log (`time,name,food,cal`)
    Intake {
        /// Path to the CSV file
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("BODYLEDGER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but did not fully succeed.
async fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(cli.data_dir)?;

    let svc = HealthService::new(&config.db_path)?;

    match cli.command {
        Commands::Login { user, json } => cmd_login(&svc, &user, json)?,
        Commands::Profile { command } => match command {
            ProfileCommands::Save {
                user,
                sex,
                birth_date,
                height,
                height_unit,
                weight,
                weight_unit,
                activity,
                json,
            } => {
                let form = ProfileForm {
                    sex,
                    birth_date,
                    height,
                    weight,
                    height_unit,
                    weight_unit,
                    activity_level: activity,
                };
                cmd_profile_save(&svc, &user, &form, json)?;
            }
            ProfileCommands::Show { user, json } => cmd_profile_show(&svc, &user, json)?,
            ProfileCommands::Levels { json } => cmd_activity_levels(json)?,
        },
        Commands::Eat {
            user,
            food,
            quantity,
            json,
        } => return cmd_eat(&svc, &user, &food, quantity, json),
        Commands::Chart { user, until, json } => cmd_chart(&svc, &user, until, json)?,
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                json,
            } => cmd_food_add(&svc, &name, calories, json)?,
            FoodCommands::List { json } => cmd_food_list(&svc, json)?,
        },
        Commands::Import { command } => {
            let (kind, file, dry_run, json) = match command {
                ImportCommands::Catalog {
                    file,
                    dry_run,
                    json,
                } => (ImportKind::Catalog, file, dry_run, json),
                ImportCommands::Profiles {
                    file,
                    dry_run,
                    json,
                } => (ImportKind::Profiles, file, dry_run, json),
                ImportCommands::Intake {
                    file,
                    dry_run,
                    json,
                } => (ImportKind::Intake, file, dry_run, json),
            };
            cmd_import(&svc, kind, &file, dry_run, json)?;
        }
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(svc, port, &bind, api_key, new_api_key).await?;
        }
    }

    Ok(true)
}
