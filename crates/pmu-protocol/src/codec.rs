//! JSON codec for inbound records and outbound frames.
//!
//! Inbound records are validated field by field before deserialization so a
//! rejected record reports exactly which field was wrong. A record is either
//! accepted as a fully populated [`PmuSample`] or rejected whole.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::frames::{Envelope, Frame};
use crate::sample::{PmuSample, REQUIRED_FIELDS};

/// Maximum accepted inbound record size (64 KiB).
pub const MAX_RECORD_SIZE: usize = 64 * 1024;

/// Reasons an inbound record is rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Record exceeds [`MAX_RECORD_SIZE`].
    #[error("Record size {0} exceeds maximum {MAX_RECORD_SIZE}")]
    TooLarge(usize),

    /// Record is not valid JSON, or a field has an unusable shape.
    #[error("Malformed record: {0}")]
    Json(#[from] serde_json::Error),

    /// Record is valid JSON but not an object.
    #[error("Record is not a JSON object")]
    NotAnObject,

    /// A required field is absent or null.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A required field is present but not a number.
    #[error("Field is not numeric: {0}")]
    NonNumeric(&'static str),

    /// The unit identifier is not a non-negative 32-bit integer.
    #[error("Field is not an unsigned integer: {0}")]
    NonInteger(&'static str),

    /// A numeric field is NaN or infinite.
    #[error("Field is not finite: {0}")]
    NonFinite(&'static str),
}

/// Errors encoding or decoding outbound frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON encoding error.
    #[error("Encoding error: {0}")]
    Encode(serde_json::Error),

    /// JSON decoding error.
    #[error("Decoding error: {0}")]
    Decode(serde_json::Error),
}

/// Decode and validate one inbound record.
///
/// # Errors
///
/// Returns a [`DecodeError`] naming the first offending field.
pub fn decode_sample(raw: &[u8]) -> Result<PmuSample, DecodeError> {
    if raw.len() > MAX_RECORD_SIZE {
        return Err(DecodeError::TooLarge(raw.len()));
    }

    let value: Value = serde_json::from_slice(raw)?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::NotAnObject);
    };
    check_required(&fields)?;

    let sample: PmuSample = serde_json::from_value(Value::Object(fields))?;
    if let Some(field) = sample.first_non_finite() {
        return Err(DecodeError::NonFinite(field));
    }
    Ok(sample)
}

fn check_required(fields: &Map<String, Value>) -> Result<(), DecodeError> {
    for name in REQUIRED_FIELDS {
        match fields.get(name) {
            None | Some(Value::Null) => return Err(DecodeError::MissingField(name)),
            Some(Value::Number(n)) => {
                if name == "pmu_id" && n.as_u64().map_or(true, |id| id > u64::from(u32::MAX)) {
                    return Err(DecodeError::NonInteger(name));
                }
            }
            Some(_) => return Err(DecodeError::NonNumeric(name)),
        }
    }
    Ok(())
}

/// Encode a sample as an inbound-format record.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_sample(sample: &PmuSample) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(sample).map_err(ProtocolError::Encode)
}

/// Encode a frame to JSON text.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(frame: &Frame) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(ProtocolError::Encode)
}

/// Encode an envelope as a `data` frame.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_envelope(envelope: &Envelope) -> Result<String, ProtocolError> {
    encode(&Frame::from(envelope.clone()))
}

/// Decode a frame from JSON text.
///
/// # Errors
///
/// Returns an error if the text is not a known frame.
pub fn decode(text: &str) -> Result<Frame, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}
