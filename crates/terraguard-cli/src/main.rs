mod display;
mod eval;
mod serve;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use terraguard_ai::consensus::VoteConfig;
use terraguard_ai::facilities::DEFAULT_LIMIT;
use terraguard_ai::{Ensemble, EnsembleConfig};
use terraguard_core::wire::{DEFAULT_SAMPLES, MAX_SAMPLES, MIN_SAMPLES};
use terraguard_core::{Severity, normalize_needs};
use terraguard_llm::OllamaClient;
use terraguard_llm::ollama::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use terraguard_store::FacilityDirectory;

#[derive(Parser)]
#[command(
    name = "terraguard",
    version,
    about = "Structured incident extraction from field reports"
)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct BackendArgs {
    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_BASE_URL, global = true)]
    ollama_url: String,

    /// Model name passed to the generation backend
    #[arg(long, env = "TG_MODEL", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// Facility directory (JSON array); no suggestions without it
    #[arg(long, env = "TG_FACILITIES", global = true)]
    facilities: Option<PathBuf>,

    /// Need tokens kept when none reaches a majority
    #[arg(long, default_value_t = 3, global = true)]
    fallback_needs: usize,

    /// Facilities suggested per incident
    #[arg(long, default_value_t = DEFAULT_LIMIT, global = true)]
    facility_limit: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract incidents from a narrative and print them
    Extract {
        /// Narrative text (reads --file when omitted)
        text: Option<String>,

        /// Read the narrative from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Number of samples (clamped to 2..=6)
        #[arg(long, default_value_t = DEFAULT_SAMPLES)]
        samples: usize,

        /// Single deterministic attempt instead of the ensemble
        #[arg(long)]
        once: bool,

        /// Print the raw JSON response instead of cards
        #[arg(long)]
        json: bool,
    },
    /// Serve the extraction HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// Compare baseline and ensemble extraction on a labelled JSONL file
    Eval {
        #[arg(long)]
        path: PathBuf,

        #[arg(long, default_value_t = DEFAULT_SAMPLES)]
        samples: usize,
    },
    /// Score hand-entered values without calling the model
    Score {
        #[arg(long)]
        severity: Option<String>,

        /// Need phrase (repeatable)
        #[arg(long = "need")]
        needs: Vec<String>,

        /// Incident time (RFC 3339 or `YYYY-MM-DD HH:MM`)
        #[arg(long)]
        time: Option<String>,
    },
}

impl BackendArgs {
    fn directory(&self) -> anyhow::Result<FacilityDirectory> {
        match &self.facilities {
            Some(path) => FacilityDirectory::load(path)
                .with_context(|| format!("loading facilities from {}", path.display())),
            None => {
                tracing::warn!("no facility directory configured; suggestions disabled");
                Ok(FacilityDirectory::empty())
            }
        }
    }

    fn ensemble_config(&self) -> EnsembleConfig {
        EnsembleConfig {
            facility_limit: self.facility_limit,
            vote: VoteConfig {
                fallback_top_needs: self.fallback_needs,
            },
            ..EnsembleConfig::default()
        }
    }

    fn ensemble(&self) -> anyhow::Result<Ensemble<OllamaClient>> {
        let client = OllamaClient::new(self.ollama_url.clone(), self.model.clone());
        Ok(Ensemble::with_config(
            client,
            self.directory()?,
            self.ensemble_config(),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("terraguard v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let backend = cli.backend;

    match cli.command {
        Commands::Extract {
            text,
            file,
            samples,
            once,
            json,
        } => {
            let text = match (text, file) {
                (Some(t), _) => t,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("provide narrative text or --file"),
            };
            let ensemble = backend.ensemble()?;
            let response = if once {
                ensemble.extract_once(&text).await?
            } else {
                if !(MIN_SAMPLES..=MAX_SAMPLES).contains(&samples) {
                    tracing::warn!(
                        samples,
                        "sample count clamped to {MIN_SAMPLES}..={MAX_SAMPLES}"
                    );
                }
                ensemble.run(&text, samples).await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else if response.reports.is_empty() {
                println!("No incidents extracted.");
            } else {
                for record in &response.reports {
                    display::print_incident_card(record);
                }
            }
        }
        Commands::Serve { bind } => {
            serve::run(&bind, backend.ensemble()?).await?;
        }
        Commands::Eval { path, samples } => {
            let ensemble = backend.ensemble()?;
            let cases = eval::load_cases(&path)?;
            let report = eval::run(&ensemble, &cases, samples).await;
            report.print(samples);
        }
        Commands::Score {
            severity,
            needs,
            time,
        } => {
            let severity = match severity.as_deref() {
                Some(s) => Some(Severity::parse(s).with_context(|| {
                    format!("unknown severity {s:?} (low|moderate|high|critical)")
                })?),
                None => None,
            };
            let needs = normalize_needs(&needs);
            let directory = backend.directory()?;
            let score = terraguard_ai::risk_score(severity, &needs, time.as_deref());
            let suggested = terraguard_ai::suggest_facilities(
                &needs,
                directory.facilities(),
                backend.facility_limit,
            );
            display::print_score(score, &needs, &suggested);
        }
    }

    Ok(())
}
