//! Scraper for the Chamber of Deputies `SitCamaraWS` web service.
//!
//! The list endpoints are thin wrappers: one request, one XML document, one JSON export.
//! The interesting part is the detail pipeline in [`process::process_details`], which fans
//! out one request per deputy over a fixed pool of workers and partitions the outcome into
//! four JSON artifacts plus a [`model::RunManifest`].

mod macros;

pub mod classify;
pub mod config;
pub mod dispatch;
mod error;
pub mod fetch;
pub mod model;
pub mod parse;
pub mod persist;
pub mod process;
pub mod progress;
pub mod request;
pub mod store;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::{Error, FetchError, Result};

const DEFAULT_BASE_URL: &str = "https://www.camara.leg.br/SitCamaraWS/Deputados.asmx";
const FALLBACK_BASE_URL: &str = "https://www.camara.gov.br/SitCamaraWS/Deputados.asmx";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Kept low so the remote server doesn't start refusing connections.
const DEFAULT_WORKER_LIMIT: usize = 8;
/// A progress line is logged every time the success count hits a multiple of this.
const PROGRESS_LOG_EVERY: usize = 20;
const DETAILS_BASE_KEY: &str = "camara/detalhesDeputados";
const DEPUTIES_BASE_KEY: &str = "camara/deputados";
const PARTIES_BASE_KEY: &str = "camara/partidos";
