//! Multi-sample extraction: probe, N generation attempts, salvage, vote, annotate.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use terraguard_core::wire::{MAX_SAMPLES, MIN_SAMPLES};
use terraguard_core::{CandidateRecord, ExtractResponse, Facility, MergedRecord};
use terraguard_llm::{LlmError, TextGenerator};
use terraguard_store::FacilityDirectory;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consensus::{VoteConfig, vote};
use crate::facilities::{DEFAULT_LIMIT, suggest_facilities};
use crate::prompt::build_extraction_prompt;
use crate::risk::score_record;
use crate::salvage::salvage_candidates;

#[derive(Error, Debug)]
pub enum EnsembleError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("generation service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    /// Temperature of the first attempt (the deterministic baseline).
    pub base_temperature: f64,
    /// Temperature of every later attempt.
    pub sample_temperature: f64,
    /// Maximum facilities attached to each merged record.
    pub facility_limit: usize,
    pub vote: VoteConfig,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            base_temperature: 0.0,
            sample_temperature: 0.6,
            facility_limit: DEFAULT_LIMIT,
            vote: VoteConfig::default(),
        }
    }
}

/// What came back from the attempts of one request.
#[derive(Debug, Default)]
pub struct AttemptTally {
    /// Attempts issued.
    pub issued: usize,
    /// Attempts that returned non-blank text (`k` for confidence).
    pub with_output: usize,
    /// Attempts whose text salvaged into JSON.
    pub salvaged: usize,
    /// Candidates recovered across all attempts, in attempt order.
    pub candidates: Vec<CandidateRecord>,
}

impl AttemptTally {
    /// Fold one attempt's result into the tally.
    fn record(&mut self, attempt: usize, result: Result<String, LlmError>) {
        self.issued += 1;
        let text = match result {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(attempt, "generation attempt returned no text");
                return;
            }
            Err(e) => {
                warn!(attempt, error = %e, "generation attempt failed");
                return;
            }
        };

        self.with_output += 1;
        match salvage_candidates(&text) {
            Ok(found) => {
                debug!(attempt, candidates = found.len(), "attempt salvaged");
                self.salvaged += 1;
                self.candidates.extend(found);
            }
            Err(e) => warn!(attempt, error = %e, "dropping unparseable attempt"),
        }
    }
}

/// Ensemble extractor over a generation backend and a facility directory.
pub struct Ensemble<G> {
    generator: G,
    directory: FacilityDirectory,
    config: EnsembleConfig,
}

impl<G: TextGenerator> Ensemble<G> {
    pub fn new(generator: G, directory: FacilityDirectory) -> Self {
        Self::with_config(generator, directory, EnsembleConfig::default())
    }

    pub fn with_config(
        generator: G,
        directory: FacilityDirectory,
        config: EnsembleConfig,
    ) -> Self {
        Self {
            generator,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn directory(&self) -> &FacilityDirectory {
        &self.directory
    }

    /// Multi-sample extraction. `samples` is clamped into `[2, 6]`.
    pub async fn run(&self, text: &str, samples: usize) -> Result<ExtractResponse, EnsembleError> {
        let samples = samples.clamp(MIN_SAMPLES, MAX_SAMPLES);
        self.extract(text, samples).await
    }

    /// Single baseline attempt at the base temperature, voted with `k = 1`.
    pub async fn extract_once(&self, text: &str) -> Result<ExtractResponse, EnsembleError> {
        self.extract(text, 1).await
    }

    async fn extract(&self, text: &str, samples: usize) -> Result<ExtractResponse, EnsembleError> {
        if text.trim().is_empty() {
            return Err(EnsembleError::EmptyInput);
        }

        self.generator.probe().await.map_err(|e| {
            warn!(model = %self.generator.model(), error = %e, "generation backend probe failed");
            EnsembleError::ServiceUnavailable(e.to_string())
        })?;

        let tally = self.attempt_all(text, samples).await;
        info!(
            issued = tally.issued,
            with_output = tally.with_output,
            salvaged = tally.salvaged,
            candidates = tally.candidates.len(),
            "generation attempts complete"
        );

        let mut reports = vote(&tally.candidates, tally.with_output, &self.config.vote);
        let now = Utc::now();
        for record in &mut reports {
            annotate(
                record,
                self.directory.facilities(),
                self.config.facility_limit,
                now,
            );
        }
        info!(reports = reports.len(), "consensus complete");
        Ok(ExtractResponse { reports })
    }

    /// Issue every attempt, then fold the results in attempt order.
    ///
    /// Voting only starts once all attempts have returned or failed.
    pub async fn attempt_all(&self, text: &str, samples: usize) -> AttemptTally {
        let prompt = build_extraction_prompt(text);
        let calls = (0..samples).map(|i| {
            let temperature = self.temperature_for(i);
            let prompt = prompt.as_str();
            async move { self.generator.generate(prompt, temperature).await }
        });
        let results = join_all(calls).await;

        let mut tally = AttemptTally::default();
        for (attempt, result) in results.into_iter().enumerate() {
            tally.record(attempt, result);
        }
        tally
    }

    fn temperature_for(&self, attempt: usize) -> f64 {
        if attempt == 0 {
            self.config.base_temperature
        } else {
            self.config.sample_temperature
        }
    }
}

/// Attach the risk score and facility suggestions to a merged record.
pub fn annotate(
    record: &mut MergedRecord,
    facilities: &[Facility],
    limit: usize,
    now: DateTime<Utc>,
) {
    record.risk_score = score_record(record, now);
    record.suggested_facilities = suggest_facilities(&record.needs, facilities, limit);
}
