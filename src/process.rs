use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tracing::{error, info};

use crate::classify::{classify, Classification};
use crate::config::PipelineConfig;
use crate::dispatch::{dispatch_all, Dispatched};
use crate::fetch::DetailSource;
use crate::model::{
    DeputyDetail, DeputyStub, FetchResult, Party, ResultCounts, RunConfig, RunManifest,
};
use crate::persist::{persist_artifacts, ArtifactReport};
use crate::request::CamaraClient;
use crate::store::{put_json, ArtifactStore};
use crate::{info_time, DEPUTIES_BASE_KEY, PARTIES_BASE_KEY};

const SUCCESS_EXAMPLES: usize = 5;
const ERROR_EXAMPLES: usize = 3;

/// What a run hands back to its caller, shaped like an HTTP response:
/// 200 everything saved, 207 some artifact failed to save, 500 nothing to report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse<T> {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> RunResponse<T> {
    fn completed(all_saved: bool, stats: T) -> Self {
        let (status_code, message) = if all_saved {
            (200, "Processing finished - all files saved")
        } else {
            (207, "Processing finished with partial failures while saving files")
        };
        RunResponse {
            status_code,
            message: message.to_string(),
            stats: Some(stats),
            error: None,
        }
    }

    fn failed(message: impl Into<String>, error: &str) -> Self {
        RunResponse {
            status_code: 500,
            message: message.into(),
            stats: None,
            error: Some(error.to_string()),
        }
    }

    /// Nothing could be saved; the stats still say what was fetched.
    fn not_saved(stats: T) -> Self {
        RunResponse {
            status_code: 500,
            message: "Failed to save the data".to_string(),
            stats: Some(stats),
            error: Some("STORAGE_ERROR".to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status_code >= 500
    }
}

/// Result of exporting one of the list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExport {
    pub timestamp: String,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extinct: Option<usize>,
    pub location: Option<String>,
}

/// Sortable local-time tag used in every artifact name.
pub fn timestamp_tag() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Full detail run: list the deputies, fetch every detail page, persist the artifacts.
pub async fn process_details(
    client: Arc<CamaraClient>,
    store: &dyn ArtifactStore,
    config: &PipelineConfig,
) -> RunResponse<RunManifest> {
    if let Err(e) = config.validate() {
        return RunResponse::failed(e.to_string(), "CONFIG_ERROR");
    }

    info_time!("=== PHASE 1: Fetching list of deputies ===");
    let stubs = match client.list_deputies().await {
        Ok(stubs) => stubs,
        Err(e) => {
            error!("Failed to get list of deputies: {e}");
            return RunResponse::failed("Failed to get list of deputies", "API_ERROR");
        }
    };

    process_stubs(client, stubs, store, config).await
}

/// Everything after the list fetch: limit, dispatch, classify, persist.
pub async fn process_stubs<S>(
    source: Arc<S>,
    mut stubs: Vec<DeputyStub>,
    store: &dyn ArtifactStore,
    config: &PipelineConfig,
) -> RunResponse<RunManifest>
where
    S: DetailSource + 'static,
{
    if let Err(e) = config.validate() {
        return RunResponse::failed(e.to_string(), "CONFIG_ERROR");
    }

    let timestamp = timestamp_tag();
    let limit = config.effective_limit();
    info!(limit = ?limit, worker_limit = config.worker_limit, "run configuration");
    if let Some(limit) = limit {
        stubs.truncate(limit);
        info!("Applied limit of {limit} deputies");
    }
    let requested_count = stubs.len();

    info_time!("=== PHASE 2: Fetching details in parallel ===");
    let dispatched = dispatch_all(source, stubs, config.worker_limit).await;
    if dispatched.results.is_empty() {
        return RunResponse::failed("Failed to process deputies", "PROCESSING_ERROR");
    }

    info_time!("=== PHASE 3: Analysing results ===");
    let classification = classify(&dispatched.results);
    info!(
        successes = classification.successes.len(),
        errors = classification.failures.len(),
        "analysis finished"
    );

    info_time!("=== PHASE 4: Saving artifacts ===");
    let report = persist_artifacts(
        store,
        &config.base_key,
        &timestamp,
        &dispatched.results,
        &classification,
    )
    .await;

    let run_config = RunConfig {
        worker_limit: config.worker_limit,
        requested_count,
        limit_applied: limit,
    };
    let manifest = build_manifest(timestamp, run_config, &dispatched, &classification, &report);
    match serde_json::to_string_pretty(&manifest) {
        Ok(json) => info!("Final statistics: {json}"),
        Err(e) => error!("Couldn't render final statistics: {e}"),
    }

    RunResponse::completed(report.all_succeeded(), manifest)
}

fn build_manifest(
    timestamp: String,
    config: RunConfig,
    dispatched: &Dispatched,
    classification: &Classification<'_>,
    report: &ArtifactReport,
) -> RunManifest {
    let success_examples = classification
        .successes
        .iter()
        .filter_map(|r| r.as_success())
        .take(SUCCESS_EXAMPLES)
        .map(|d| {
            let name = d
                .current_display_name
                .as_deref()
                .or(d.stub.display_name.as_deref())
                .unwrap_or("N/A");
            let party = d
                .current_party
                .abbreviation
                .as_deref()
                .or(d.stub.party.as_deref())
                .unwrap_or("N/A");
            let state = d
                .current_state
                .as_deref()
                .or(d.stub.state.as_deref())
                .unwrap_or("N/A");
            format!("{name} ({party}-{state}), {} committees", d.committee_count)
        })
        .collect();

    let error_examples = classification
        .failures
        .iter()
        .take(ERROR_EXAMPLES)
        .filter_map(|r| match r {
            FetchResult::Failure {
                stub,
                kind,
                message,
            } => Some(format!("{}: {kind} - {message}", stub.label())),
            FetchResult::Success { .. } => None,
        })
        .collect();

    RunManifest {
        timestamp,
        config,
        result_counts: ResultCounts::new(
            dispatched.results.len(),
            classification.successes.len(),
        ),
        error_type_histogram: classification.error_histogram.clone(),
        written_artifact_locations: report.locations(),
        artifact_status: report.statuses(),
        fetch_elapsed_secs: dispatched.elapsed.as_secs_f64(),
        success_examples,
        error_examples,
    }
}

/// What a single-deputy check reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailCheck {
    pub id: String,
    pub name: Option<String>,
    pub party: Option<String>,
    pub state: Option<String>,
    pub committees: usize,
    pub terms: usize,
    pub leaderships: usize,
}

impl DetailCheck {
    fn new(id: &str, detail: &DeputyDetail) -> Self {
        DetailCheck {
            id: id.to_string(),
            name: detail
                .current_display_name
                .clone()
                .or_else(|| detail.civil_name.clone()),
            party: detail.current_party.abbreviation.clone(),
            state: detail.current_state.clone(),
            committees: detail.committee_count,
            terms: detail.term_count,
            leaderships: detail.leadership_count,
        }
    }
}

/// Fetches one detail page on its own, as a smoke test of the service before a full run.
/// A failed fetch answers 500 with the error kind as `error`.
pub async fn check_deputy<S>(source: &S, id: &str) -> RunResponse<DetailCheck>
where
    S: DetailSource + ?Sized,
{
    let start_time = Local::now();
    match source.fetch_detail(id).await {
        Ok(detail) => {
            let check = DetailCheck::new(id, &detail);
            info_time!(
                start_time,
                "Deputy {id}: {} ({}-{}), {} committees",
                check.name.as_deref().unwrap_or("N/A"),
                check.party.as_deref().unwrap_or("N/A"),
                check.state.as_deref().unwrap_or("N/A"),
                check.committees
            );
            RunResponse::completed(true, check)
        }
        Err(e) => {
            error!(id, kind = %e.kind(), "Detail check failed: {e}");
            RunResponse::failed(e.to_string(), e.kind().as_str())
        }
    }
}

pub fn active_parties(parties: &[Party]) -> Vec<&Party> {
    parties.iter().filter(|p| p.is_active()).collect()
}

pub fn extinct_parties(parties: &[Party]) -> Vec<&Party> {
    parties.iter().filter(|p| !p.is_active()).collect()
}

/// Fetches the deputy list and stores it as `camara/deputados/deputados_<ts>.json`.
pub async fn export_deputies(
    client: &CamaraClient,
    store: &dyn ArtifactStore,
) -> RunResponse<ListExport> {
    let start_time = Local::now();
    let deputies = match client.list_deputies().await {
        Ok(deputies) => deputies,
        Err(e) => {
            error!("Failed to get list of deputies: {e}");
            return RunResponse::failed("Failed to get deputies after every attempt", "API_ERROR");
        }
    };

    let timestamp = timestamp_tag();
    let key = format!("{DEPUTIES_BASE_KEY}/deputados_{timestamp}.json");
    let location = put_json(store, &key, &deputies).await;
    info_time!(start_time, "Exported {} deputies", deputies.len());

    let saved = location.is_some();
    let export = ListExport {
        timestamp,
        total: deputies.len(),
        active: None,
        extinct: None,
        location,
    };
    if saved {
        RunResponse::completed(true, export)
    } else {
        RunResponse::not_saved(export)
    }
}

/// Fetches the party list and stores it as `camara/partidos/partidos_completo_<ts>.json`.
pub async fn export_parties(
    client: &CamaraClient,
    store: &dyn ArtifactStore,
) -> RunResponse<ListExport> {
    let start_time = Local::now();
    let parties = match client.list_parties().await {
        Ok(parties) => parties,
        Err(e) => {
            error!("Failed to get list of parties: {e}");
            return RunResponse::failed("Failed to get parties after every attempt", "API_ERROR");
        }
    };

    let timestamp = timestamp_tag();
    let key = format!("{PARTIES_BASE_KEY}/partidos_completo_{timestamp}.json");
    let location = put_json(store, &key, &parties).await;
    info_time!(start_time, "Exported {} parties", parties.len());

    RunResponse::completed(
        location.is_some(),
        ListExport {
            timestamp,
            total: parties.len(),
            active: Some(active_parties(&parties).len()),
            extinct: Some(extinct_parties(&parties).len()),
            location,
        },
    )
}
