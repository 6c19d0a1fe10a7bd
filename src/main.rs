use std::process::ExitCode;

use card_ledger::commands::{Invocation, dispatch};
use card_ledger::config::{self, database};
use card_ledger::core::{CardLedger, LedgerSettings};
use card_ledger::errors::{Error, Result};
use card_ledger::store::SqliteStore;
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: card-ledger <function> <caller> [args...]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let function = args.next().ok_or_else(|| Error::invalid(USAGE))?;
    let args: Vec<String> = args.collect();
    let invocation = Invocation::parse(&function, &args)?;

    // 3. Load settings and open the store
    let settings = config::load_default_config()?;
    let database_url = database::get_database_url();
    database::ensure_database_dir(&database_url)?;
    let store = SqliteStore::connect(&database_url).await?;
    info!("Ledger store ready at {}", database_url);

    // 4. Bootstrap registries and the administrator, then run the command
    let mut ledger = CardLedger::new(store, LedgerSettings::from(&settings));
    ledger.bootstrap(&settings).await?;

    if let Some(payload) = dispatch(&mut ledger, invocation).await? {
        let rendered = serde_json::to_string_pretty(&payload)
            .map_err(|e| Error::invalid(format!("response encoding failed: {e}")))?;
        println!("{rendered}");
    }
    Ok(())
}
