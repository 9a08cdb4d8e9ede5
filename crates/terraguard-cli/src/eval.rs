//! Baseline vs. ensemble comparison on a labelled JSONL file.
//!
//! Each non-blank line is `{"input": "...", "gold": {"reports": [...]}}`. Only
//! the first gold report and the first predicted report are compared.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Deserialize;
use terraguard_ai::{Ensemble, EnsembleError};
use terraguard_core::metrics::jaccard;
use terraguard_core::{ExtractResponse, Severity, normalize_needs};
use terraguard_llm::TextGenerator;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct EvalCase {
    pub input: String,
    pub gold: GoldSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoldSet {
    pub reports: Vec<GoldReport>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoldReport {
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub needs: Vec<String>,
}

pub fn load_cases(path: &Path) -> anyhow::Result<Vec<EvalCase>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_cases(&raw)
}

pub fn parse_cases(raw: &str) -> anyhow::Result<Vec<EvalCase>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}", i + 1))
        })
        .collect()
}

/// Running totals for one extraction mode.
#[derive(Debug, Default, Clone)]
pub struct ModeStats {
    pub items: usize,
    pub valid: usize,
    pub severity_hits: usize,
    pub needs_jaccard: f64,
    pub elapsed: Duration,
}

impl ModeStats {
    /// Fold one request's outcome into the totals.
    pub fn record(
        &mut self,
        gold: Option<&GoldReport>,
        outcome: &Result<ExtractResponse, EnsembleError>,
        elapsed: Duration,
    ) {
        self.items += 1;
        self.elapsed += elapsed;

        let Ok(response) = outcome else { return };
        self.valid += 1;

        let (Some(pred), Some(gold)) = (response.reports.first(), gold) else {
            return;
        };
        if pred.severity == gold.severity {
            self.severity_hits += 1;
        }
        self.needs_jaccard += jaccard(&pred.needs, &normalize_needs(&gold.needs));
    }

    pub fn summary(&self) -> String {
        if self.items == 0 {
            return "no items".to_string();
        }
        let n = self.items as f64;
        format!(
            "JSON valid: {}/{},  avg latency: {:.0} ms, severity acc: {:.2}, needs Jaccard: {:.2}",
            self.valid,
            self.items,
            self.elapsed.as_secs_f64() * 1000.0 / n,
            self.severity_hits as f64 / n,
            self.needs_jaccard / n,
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct EvalReport {
    pub baseline: ModeStats,
    pub ensemble: ModeStats,
}

impl EvalReport {
    pub fn print(&self, samples: usize) {
        println!("Items: {}", self.baseline.items);
        println!("Base   - {}", self.baseline.summary());
        println!("Ens({samples}) - {}", self.ensemble.summary());
    }
}

pub async fn run<G: TextGenerator>(
    ensemble: &Ensemble<G>,
    cases: &[EvalCase],
    samples: usize,
) -> EvalReport {
    let mut report = EvalReport::default();
    for (i, case) in cases.iter().enumerate() {
        let text = case.input.trim();
        let gold = case.gold.reports.first();

        let started = Instant::now();
        let outcome = ensemble.extract_once(text).await;
        report.baseline.record(gold, &outcome, started.elapsed());
        if let Err(e) = &outcome {
            warn!(case = i, error = %e, "baseline extraction failed");
        }

        let started = Instant::now();
        let outcome = ensemble.run(text, samples).await;
        report.ensemble.record(gold, &outcome, started.elapsed());
        if let Err(e) = &outcome {
            warn!(case = i, error = %e, "ensemble extraction failed");
        }
    }
    info!(cases = cases.len(), "evaluation complete");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraguard_core::MergedRecord;

    fn response(severity: Option<Severity>, needs: &[&str]) -> ExtractResponse {
        ExtractResponse {
            reports: vec![MergedRecord {
                severity,
                needs: needs.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn parses_jsonl_and_skips_blank_lines() {
        let raw = r#"{"input":"Tree down","gold":{"reports":[{"severity":"low","needs":["debris"]}]}}

{"input":"Fire","gold":{"reports":[]}}
"#;
        let cases = parse_cases(raw).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].gold.reports[0].severity, Some(Severity::Low));
        assert!(cases[1].gold.reports.is_empty());
    }

    #[test]
    fn bad_line_reports_its_number() {
        let err = parse_cases("{\"input\":\"a\",\"gold\":{\"reports\":[]}}\nnot json").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn stats_accumulate() {
        let gold = GoldReport {
            severity: Some(Severity::High),
            needs: vec!["injured people".into(), "trapped".into()],
        };
        let mut stats = ModeStats::default();
        stats.record(
            Some(&gold),
            &Ok(response(Some(Severity::High), &["medical"])),
            Duration::from_millis(100),
        );
        stats.record(
            Some(&gold),
            &Err(EnsembleError::ServiceUnavailable("down".into())),
            Duration::from_millis(300),
        );

        assert_eq!(stats.items, 2);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.severity_hits, 1);
        assert_eq!(stats.needs_jaccard, 0.5);
        assert!(stats.summary().contains("avg latency: 200 ms"));
    }

    #[test]
    fn empty_prediction_is_valid_but_unscored() {
        let mut stats = ModeStats::default();
        stats.record(
            Some(&GoldReport::default()),
            &Ok(ExtractResponse::default()),
            Duration::ZERO,
        );
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.severity_hits, 0);
        assert_eq!(stats.needs_jaccard, 0.0);
    }
}
