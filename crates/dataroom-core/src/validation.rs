//! Input guards shared by every operation.
//!
//! Each guard returns a typed error instead of panicking, so operations can
//! compose them with `?` before touching any state.

use crate::error::ValidationError;
use crate::types::Timestamp;

/// Highest accepted quality score.
pub const MAX_QUALITY_SCORE: u8 = 100;

/// Quality scores must lie in `0..=100`.
pub fn validate_quality_score(score: u8) -> Result<(), ValidationError> {
    if score > MAX_QUALITY_SCORE {
        return Err(ValidationError::QualityScoreOutOfRange(score));
    }
    Ok(())
}

/// Metadata hashes must be non-empty.
pub fn validate_metadata_hash(hash: &str) -> Result<(), ValidationError> {
    if hash.is_empty() {
        return Err(ValidationError::EmptyMetadataHash);
    }
    Ok(())
}

/// Request topics must be non-empty.
pub fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.is_empty() {
        return Err(ValidationError::EmptyTopic);
    }
    Ok(())
}

/// Deadlines must be strictly after `now`.
pub fn validate_deadline(deadline: Timestamp, now: Timestamp) -> Result<(), ValidationError> {
    if deadline <= now {
        return Err(ValidationError::DeadlineNotInFuture { deadline, now });
    }
    Ok(())
}
