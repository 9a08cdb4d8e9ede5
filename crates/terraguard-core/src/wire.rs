//! Request and response bodies of the extraction API.

use serde::{Deserialize, Serialize};

use crate::record::MergedRecord;

pub const DEFAULT_SAMPLES: usize = 3;
pub const MIN_SAMPLES: usize = 2;
pub const MAX_SAMPLES: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
    #[serde(default)]
    pub samples: Option<i64>,
}

impl ExtractRequest {
    /// Requested sample count clamped into `[MIN_SAMPLES, MAX_SAMPLES]`.
    pub fn samples(&self) -> usize {
        clamp_samples(self.samples)
    }
}

pub fn clamp_samples(requested: Option<i64>) -> usize {
    match requested {
        Some(n) => n.clamp(MIN_SAMPLES as i64, MAX_SAMPLES as i64) as usize,
        None => DEFAULT_SAMPLES,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub reports: Vec<MergedRecord>,
}

/// Body returned alongside non-2xx API statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
