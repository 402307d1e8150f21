use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::extract::{self, TableNotFound};
use crate::fetch::{self, FetchError};
use crate::record::Record;
use crate::store::RecordStore;
use crate::sync::{self, SyncError};

/// One variant per pipeline stage that can fail; `Done` and `Failed`
/// are the only terminal outcomes of an invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("extract failed: {0}")]
    NoTable(#[from] TableNotFound),

    #[error("sync failed: {0}")]
    Sync(#[from] SyncError),
}

impl PipelineError {
    fn stage(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::NoTable(_) => "extract",
            PipelineError::Sync(_) => "sync",
        }
    }
}

/// Fetch → extract → synchronize, strictly sequential, one outcome per
/// invocation. On success the snapshot that now lives in the store is
/// returned as the result payload.
pub async fn run<S: RecordStore>(store: &S, url: &str) -> Result<Vec<Record>, PipelineError> {
    let body = fetch::fetch_page(url).await?;
    ingest(store, &body)
}

/// The post-fetch half of the pipeline: extraction (pure) then store
/// synchronization. A failed extraction aborts before any store access.
pub fn ingest<S: RecordStore>(store: &S, body: &str) -> Result<Vec<Record>, PipelineError> {
    let snapshot = extract::extract_table(body)?;
    sync::replace_all(store, &snapshot)?;
    info!("Pipeline done: {} records live", snapshot.len());
    Ok(snapshot)
}

/// Transport payload returned to the invoker: status code plus a JSON
/// string body, the framing of the original trigger.
#[derive(Debug, PartialEq, Serialize)]
pub struct RunResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

pub fn respond(outcome: Result<Vec<Record>, PipelineError>) -> RunResponse {
    match outcome {
        Ok(records) => {
            let body = serde_json::to_string(&records).unwrap_or_else(|e| {
                error!("Failed to serialize snapshot of {} records: {}", records.len(), e);
                "[]".to_string()
            });
            RunResponse {
                status_code: 200,
                body,
            }
        }
        Err(e) => {
            error!("{} stage failed: {}", e.stage(), e);
            let (status_code, body) = match &e {
                PipelineError::NoTable(_) => {
                    (404, json!({ "error": "no table found in source page" }))
                }
                PipelineError::Fetch(cause) => (
                    500,
                    json!({ "error": "failed to fetch source page", "details": cause.to_string() }),
                ),
                PipelineError::Sync(cause) => (
                    500,
                    json!({ "error": "failed to synchronize record store", "details": cause.to_string() }),
                ),
            };
            RunResponse {
                status_code,
                body: body.to_string(),
            }
        }
    }
}

// ── Tests ──
