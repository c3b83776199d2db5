use std::sync::Arc;

use colored::Colorize;
use log::{error, info};
use thiserror::Error;
use tutor_classroom::{PgDatabase, SharedDatabase, Tutor};
use tutor_core::Config;

mod logging;

#[derive(Debug, Error)]
enum TutorError {
    #[error("Could not initialize database: {0}")]
    Database(#[from] tutor_classroom::DatabaseError),
    #[error("Server stopped: {0}")]
    Server(#[from] std::io::Error),
}

impl TutorError {
    fn hint(&self) -> String {
        match self {
            TutorError::Database(_) => "This is a database error. Make sure Postgres is running and TUTOR_DATABASE_URL points to it, then try again.".to_string(),
            TutorError::Server(_) => "Make sure TUTOR_SERVER_PORT is free, then try again.".to_string(),
        }
    }
}

async fn run() -> Result<(), TutorError> {
    let config = Config::from_env();

    info!("Connecting to database...");

    let database = PgDatabase::new(&config.database_url).await?;
    database.migrate().await?;

    let database: SharedDatabase = Arc::new(database);
    let tutor = Tutor::new(config, database);

    info!("Initialized successfully.");

    tutor_server::run_server(tutor).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(error) = run().await {
        error!(
            "{} Read the error below to troubleshoot the issue.",
            "The tutor failed to start!".bold().red()
        );
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
    }
}
