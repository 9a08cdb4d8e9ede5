//! Extraction pipeline: raw model text in, merged and annotated incidents out.
//!
//! [`salvage`] recovers JSON from whatever the model wrote, [`consensus`]
//! votes candidates from several samples into one record per incident, and
//! [`risk`] and [`facilities`] annotate the result. [`Ensemble`] drives the
//! whole thing against a [`terraguard_llm::TextGenerator`].

pub mod consensus;
pub mod ensemble;
pub mod facilities;
pub mod prompt;
pub mod risk;
pub mod salvage;

pub use consensus::{VoteConfig, bucket_key, vote};
pub use ensemble::{Ensemble, EnsembleConfig, EnsembleError, annotate};
pub use facilities::suggest_facilities;
pub use prompt::build_extraction_prompt;
pub use risk::{risk_score, risk_score_at};
pub use salvage::{SalvageError, salvage, salvage_candidates};
