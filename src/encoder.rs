//! Output envelopes
//!
//! Wraps computed results with producer metadata so downstream consumers can tell
//! which engine build produced them and when.

use crate::error::ComputeError;
use crate::{PRODUCER_NAME, PULSE_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Producer metadata attached to every envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// A computed payload plus provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub producer: Producer,
    pub computed_at_utc: DateTime<Utc>,
    pub payload: T,
}

/// Encoder producing enveloped JSON
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn wrap<T>(&self, payload: T) -> Envelope<T> {
        Envelope {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: PULSE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now(),
            payload,
        }
    }

    pub fn encode_to_json<T: Serialize>(&self, payload: &T) -> Result<String, ComputeError> {
        serde_json::to_string(&self.wrap(payload)).map_err(ComputeError::JsonError)
    }

    pub fn encode_to_json_pretty<T: Serialize>(&self, payload: &T) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.wrap(payload)).map_err(ComputeError::JsonError)
    }
}
