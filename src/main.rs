use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use camara_scrap::config::{ApiConfig, PipelineConfig};
use camara_scrap::process::{
    check_deputy, export_deputies, export_parties, process_details, RunResponse,
};
use camara_scrap::request::CamaraClient;
use camara_scrap::store::{ArtifactStore, HttpStore, LocalStore};
use camara_scrap::{info_time, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "camara-scrap", version, about = "Scrapes deputies and parties from the Chamber web service")]
struct Cli {
    /// Base URL of the Deputados.asmx service
    #[arg(long, env = "CAMARA_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Secondary base URL for the list endpoints
    #[arg(long, env = "CAMARA_FALLBACK_URL", global = true)]
    fallback_url: Option<String>,

    /// Don't retry the list endpoints against the secondary host
    #[arg(long, global = true, conflicts_with = "fallback_url")]
    no_fallback: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct StoreArgs {
    /// Write artifacts below this directory
    #[arg(long, env = "CAMARA_OUT_DIR", default_value = ".", global = true)]
    out_dir: PathBuf,

    /// PUT artifacts to this URL prefix instead of the local directory
    #[arg(long, env = "CAMARA_STORE_URL", global = true)]
    store_url: Option<String>,

    /// Bearer token sent with every PUT to --store-url
    #[arg(long, env = "CAMARA_STORE_TOKEN", hide_env_values = true, global = true)]
    store_token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every deputy's detail page and write the four detail artifacts
    Details {
        /// Concurrent detail requests
        #[arg(long, env = "CAMARA_WORKERS", default_value_t = PipelineConfig::default().worker_limit)]
        workers: usize,

        /// Only process the first N deputies
        #[arg(long, env = "CAMARA_LIMIT")]
        limit: Option<usize>,

        /// Key prefix for the artifacts
        #[arg(long, default_value_t = PipelineConfig::default().base_key)]
        base_key: String,
    },
    /// Export the list of deputies in office
    Deputies,
    /// Export the list of parties
    Parties,
    /// Fetch a single deputy's detail page and print what was extracted
    Detail {
        /// The deputy's ideCadastro
        id: String,
    },
}

impl Cli {
    fn api_config(&self) -> ApiConfig {
        let mut config = match &self.base_url {
            Some(url) => ApiConfig::with_base_url(url.as_str()),
            None => ApiConfig::default(),
        };
        if let Some(url) = &self.fallback_url {
            config = config.with_fallback_base_url(url.as_str());
        }
        if self.no_fallback {
            config.fallback_base_url = None;
        }
        config.with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl StoreArgs {
    fn build(&self) -> Result<Box<dyn ArtifactStore>> {
        let store: Box<dyn ArtifactStore> = match &self.store_url {
            Some(url) => Box::new(HttpStore::new(url.as_str(), self.store_token.clone())?),
            None => Box::new(LocalStore::new(&self.out_dir)),
        };
        Ok(store)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camara_scrap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let start_time = Local::now();
    let cli = Cli::parse();
    let client = CamaraClient::new(cli.api_config())?;
    let store = cli.store.build()?;

    let failed = match cli.command {
        Command::Details {
            workers,
            limit,
            base_key,
        } => {
            let config = PipelineConfig {
                worker_limit: workers,
                limit,
                base_key,
            };
            report(process_details(Arc::new(client), store.as_ref(), &config).await)?
        }
        Command::Deputies => report(export_deputies(&client, store.as_ref()).await)?,
        Command::Parties => report(export_parties(&client, store.as_ref()).await)?,
        Command::Detail { id } => report(check_deputy(&client, &id).await)?,
    };
    info_time!(start_time, "Full program time:");

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Prints the response on stdout and tells whether the run failed.
fn report<T: Serialize>(response: RunResponse<T>) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(response.is_failure())
}
