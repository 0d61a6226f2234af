mod cli;
mod console;
mod infra;
mod operator;
mod routes;
mod server;

use triage::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
