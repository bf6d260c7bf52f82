use super::engine::TransferEngine;
use crate::domain::transfer::TransferRequest;
use crate::domain::wallet::Balance;
use crate::error::{Result, TransferError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub committed: usize,
    pub failed: usize,
}

/// Runs every request through the engine with at most `concurrency` transfers
/// in flight.
///
/// Requests are started in input order; with `concurrency == 1` they also
/// commit in input order. Unreadable rows and failed transfers are logged and
/// counted, and never stop the batch.
pub async fn process_transfers<I>(
    engine: Arc<TransferEngine>,
    requests: I,
    concurrency: usize,
) -> BatchSummary
where
    I: IntoIterator<Item = Result<TransferRequest>>,
{
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut summary = BatchSummary::default();

    for (row, request) in requests.into_iter().enumerate() {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                warn!(row, error = %e, "Error reading transfer");
                summary.failed += 1;
                continue;
            }
        };

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        while let Some(joined) = tasks.try_join_next() {
            record(joined, &mut summary);
        }

        let engine = engine.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let outcome = engine
                .transfer(&request.from, &request.to, request.amount)
                .await;
            (row, request, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        record(joined, &mut summary);
    }

    summary
}

type TransferOutcome = (usize, TransferRequest, std::result::Result<Balance, TransferError>);

fn record(joined: std::result::Result<TransferOutcome, JoinError>, summary: &mut BatchSummary) {
    match joined {
        Ok((row, _, Ok(balance))) => {
            debug!(row, %balance, "transfer row committed");
            summary.committed += 1;
        }
        Ok((row, request, Err(e))) => {
            warn!(
                row,
                from = %request.from,
                to = %request.to,
                amount = request.amount,
                error = %e,
                "Error processing transfer"
            );
            summary.failed += 1;
        }
        Err(e) => {
            warn!(error = %e, "transfer task aborted");
            summary.failed += 1;
        }
    }
}
