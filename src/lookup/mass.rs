//! Concurrent mass lookups with jittered pacing and a shared deadline

use crate::domain::DomainNormalizer;
use crate::error::{Result, WhoisError};
use crate::lookup::WhoisService;
use crate::types::MassLookupOutcome;
use futures::future::join_all;
use parking_lot::Mutex;
use rand::Rng;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout_at, Instant};

impl WhoisService {
    /// Look up every query, producing exactly one outcome per input.
    ///
    /// Inputs that fail normalization are answered without touching the
    /// network. The rest share an overall deadline (the configured mass
    /// deadline, capped by `deadline`); whatever is still running when it
    /// passes is dropped and reported as `DeadlineExceeded`. Outcomes are in
    /// input order, which callers should not rely on.
    pub async fn lookup_many(
        &self,
        queries: &[String],
        deadline: Option<Instant>,
    ) -> Vec<MassLookupOutcome> {
        let started = Instant::now();
        let overall = match deadline {
            Some(deadline) if deadline < started + self.config.mass_deadline => deadline,
            _ => started + self.config.mass_deadline,
        };

        let index = self.registry().ready().await;
        let normalizer = DomainNormalizer::new(index);
        let semaphore = Semaphore::new(self.config.max_in_flight.max(1));
        let slots: Mutex<Vec<Option<MassLookupOutcome>>> = Mutex::new(vec![None; queries.len()]);

        let workers = queries.iter().enumerate().map(|(position, input)| {
            let normalized = normalizer.normalize(input);
            let semaphore = &semaphore;
            let slots = &slots;
            async move {
                let outcome = match normalized {
                    Ok(root) => self.lookup_one(input, &root, semaphore, overall).await,
                    Err(e) => {
                        tracing::debug!(domain = %input, error = %e, "Skipping invalid domain");
                        MassLookupOutcome::failure(input.as_str(), e)
                    }
                };
                slots.lock()[position] = Some(outcome);
            }
        });

        if timeout_at(overall, join_all(workers)).await.is_err() {
            tracing::warn!(
                domains = queries.len(),
                deadline_ms = overall.saturating_duration_since(started).as_millis() as u64,
                "Mass lookup hit its deadline"
            );
        }

        let outcomes: Vec<MassLookupOutcome> = slots
            .into_inner()
            .into_iter()
            .zip(queries)
            .map(|(slot, input)| {
                slot.unwrap_or_else(|| {
                    tracing::warn!(domain = %input, "Lookup abandoned at deadline");
                    MassLookupOutcome::failure(input.as_str(), WhoisError::deadline_exceeded(input.as_str()))
                })
            })
            .collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!(
            domains_requested = queries.len(),
            succeeded = succeeded,
            failed = outcomes.len() - succeeded,
            batch_duration_ms = started.elapsed().as_millis() as u64,
            "Mass lookup completed"
        );

        outcomes
    }

    async fn lookup_one(
        &self,
        input: &str,
        root: &str,
        semaphore: &Semaphore,
        overall: Instant,
    ) -> MassLookupOutcome {
        let _permit = match semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return MassLookupOutcome::failure(input, WhoisError::deadline_exceeded(input)),
        };

        sleep(self.jitter()).await;

        let query_deadline = self.query_deadline(Some(overall));
        match self.lookup_root(root, query_deadline).await {
            Ok(record) => MassLookupOutcome::success(input, record),
            Err(e) => MassLookupOutcome::failure(input, at_deadline(e, input, overall)),
        }
    }

    /// Uniform pause drawn from the configured jitter window
    fn jitter(&self) -> Duration {
        let min = self.config.jitter_min.as_millis() as u64;
        let max = self.config.jitter_max.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// A query cut short by the batch deadline reports that, not its own timeout
fn at_deadline(error: WhoisError, input: &str, overall: Instant) -> WhoisError {
    if matches!(error, WhoisError::Timeout { .. }) && Instant::now() >= overall {
        WhoisError::deadline_exceeded(input)
    } else {
        error
    }
}

/// Reject batches above `max` before any work starts
pub fn check_admission(size: usize, max: usize) -> Result<()> {
    if size > max {
        return Err(WhoisError::batch_too_large(size, max));
    }
    Ok(())
}
