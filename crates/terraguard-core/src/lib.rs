pub mod metrics;
pub mod needs;
pub mod record;
pub mod schema;
pub mod time;
pub mod wire;

pub use needs::{NEED_VOCABULARY, normalize_need, normalize_needs};
pub use record::{
    CandidateRecord, Facility, FacilityType, FieldConfidence, MergedRecord, Severity,
};
pub use time::{minute_bucket, parse_timestamp};
pub use wire::{ErrorBody, ExtractRequest, ExtractResponse, clamp_samples};
