pub mod ai;
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod remote;
pub mod session;
pub mod state;
pub mod storage;
pub mod surface;
pub use error::{AppError, AppResult};

/// Entrypoint used by the binary and other CLI bindings.
pub async fn run(cli: cli::Cli) -> AppResult<()> {
    logging::init();
    tracing::info!("starting newsdesk-editor");

    match cli.command {
        cli::Command::Apply(args) => {
            let record = cli::apply(args).await?;
            tracing::info!(path = %record.local_path, id = record.id, "edit saved");
            let summary = serde_json::to_string_pretty(&record)
                .map_err(|err| AppError::Runtime(err.into()))?;
            println!("{summary}");
        }
    }
    Ok(())
}
