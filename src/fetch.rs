//! One deputy in, one [`FetchResult`] out.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::model::{DeputyDetail, DeputyStub, EnrichedDeputy, ErrorKind, FetchResult};
use crate::parse::parse_deputy_detail;
use crate::progress::{ProgressCounters, ProgressTracker};
use crate::xml::parse_document;
use crate::{FetchError, PROGRESS_LOG_EVERY};

/// Anything that can produce the detail record of a deputy.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch_detail(&self, id: &str) -> Result<DeputyDetail, FetchError>;
}

/// Fetches the detail page of `stub` and turns every outcome into a [`FetchResult`].
/// Records exactly one progress event, whatever happens.
pub async fn fetch_one<S>(
    source: &S,
    stub: DeputyStub,
    progress: &ProgressTracker,
    worker: &str,
) -> FetchResult
where
    S: DetailSource + ?Sized,
{
    let result = match source.fetch_detail(&stub.id).await {
        Ok(detail) => FetchResult::Success {
            deputy: EnrichedDeputy::overlay(stub, detail),
            worker: worker.to_string(),
        },
        Err(err) => FetchResult::failure(stub, err.kind(), err.to_string()),
    };

    let counters = progress.record(result.is_success());
    log_progress(&result, counters, worker);
    result
}

/// True on every `PROGRESS_LOG_EVERY`-th cumulative success.
fn is_progress_milestone(counters: &ProgressCounters) -> bool {
    counters.succeeded > 0 && counters.succeeded % PROGRESS_LOG_EVERY == 0
}

fn log_progress(result: &FetchResult, counters: ProgressCounters, worker: &str) {
    match result {
        FetchResult::Success { deputy, .. } => {
            if is_progress_milestone(&counters) {
                info!(
                    worker,
                    "✓ {} processed - {} successes of {} processed",
                    deputy.stub.label(),
                    counters.succeeded,
                    counters.processed
                );
            }
        }
        FetchResult::Failure {
            stub,
            kind,
            message,
        } => match kind {
            ErrorKind::HttpError | ErrorKind::EmptyResponse | ErrorKind::ParseError => warn!(
                worker,
                id = %stub.id,
                kind = %kind,
                "{} for {} - {}/{}",
                message,
                stub.label(),
                counters.processed,
                counters.total
            ),
            _ => error!(
                worker,
                id = %stub.id,
                kind = %kind,
                "{} for {} - {}/{}",
                message,
                stub.label(),
                counters.processed,
                counters.total
            ),
        },
    }
}

/// Interprets the body of a `200 OK` detail response.
pub fn interpret_detail_body(body: &[u8]) -> Result<DeputyDetail, FetchError> {
    let content = std::str::from_utf8(body)
        .map_err(|e| FetchError::Unexpected(format!("response is not UTF-8: {e}")))?
        .trim();
    if content.is_empty() {
        return Err(FetchError::EmptyResponse);
    }

    let root = parse_document(content)?;
    parse_deputy_detail(&root)
}
