//! pgframe - print the result of a PostgreSQL query as a table.

mod cli;

use anyhow::Context;
use cli::{Cli, OutputFormat};
use pg_dataframe::db::{MockDriver, PostgresDriver};
use pg_dataframe::logging;
use pg_dataframe::{FrameError, QueryExecutor};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<FrameError>() {
            Some(frame_error) => error!("{}: {}", frame_error.category(), frame_error),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let executor = if cli.mock_db {
        QueryExecutor::new(MockDriver::new())
    } else {
        QueryExecutor::new(PostgresDriver)
    };
    let executor = executor
        .with_normalizer(cli.normalizer())
        .with_section(&cli.section);

    let frame = executor.build(&cli.config, &cli.query).await?;

    match cli.format {
        OutputFormat::Text => print!("{frame}"),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&frame.to_json())
                .context("Failed to serialize result as JSON")?;
            println!("{json}");
        }
    }

    Ok(())
}
