//! # GivingWorks API Main Entry Point
//!
//! This is the main entry point for the GivingWorks API service.

use clap::{Parser, Subcommand};

use givingworks::{
    config::ConfigLoader, db::init_pool, migration, seeds, server::run_server, telemetry,
};
use sea_orm_migration::MigratorTrait;

#[derive(Parser)]
#[command(name = "givingworks", version, about = "GivingWorks corporate giving API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations and start the HTTP server (default)
    Serve,
    /// Populate the database with demo companies, users and donations
    Seed,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    println!("Loaded configuration for profile: {}", config.profile);
    if let Ok(redacted_json) = config.redacted_json() {
        println!("Configuration: {}", redacted_json);
    }

    let db = init_pool(&config).await?;
    migration::Migrator::up(&db, None).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config, db).await,
        Command::Seed => {
            seeds::seed_all(&config, &db).await?;
            Ok(())
        }
    }
}
