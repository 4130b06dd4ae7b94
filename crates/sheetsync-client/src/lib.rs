pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mutation;
pub mod query;
pub mod sheets;

pub use cli::{Cli, Commands};
pub use config::{Config, QueryConfig, RetryPolicy};
pub use error::{NetworkError, SyncError};
pub use gateway::{Gateway, HttpGateway};
pub use mutation::{Mutation, MutationCallbacks, MutationStatus};
pub use query::{QueryClient, QueryKey, QueryObserver, QueryOptions, QueryResult, QueryStatus};
pub use sheets::{SheetClient, WorksheetMutation};

/// Run one CLI command against the configured API and print its output
pub async fn run(config: Config, cli: Cli) -> anyhow::Result<()> {
    let config = match cli.api_url {
        Some(url) => config.with_api_url(url),
        None => config,
    };

    tracing::debug!("Using API at {}", config.api_url);
    let client = SheetClient::from_config(&config)?;

    let output = cli::execute(&client, cli.command).await?;
    print!("{}", output);

    Ok(())
}
