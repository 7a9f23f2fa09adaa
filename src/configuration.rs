//! Parsing and validation of synthesis requests.
//!
//! A request arrives either programmatically through [`SynthesisRequest::build`]
//! or as a JSON section of the grading configuration. Both paths enforce the
//! same invariants; a request that exists is always valid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed synthesis request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid synthesis request: {0}")]
    Invalid(&'static str),
}

/// The immutable input of one synthesis: which test module to run, which file
/// to measure coverage for, the point value of each threshold tier and the
/// percentage the tiers start from.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SynthesisRequest {
    testmodule: String,
    filename: String,
    points: Vec<u32>,
    #[serde(default)]
    minimum: f64,
}

impl SynthesisRequest {
    pub fn build(
        testmodule: impl Into<String>,
        filename: impl Into<String>,
        points: Vec<u32>,
        minimum: f64,
    ) -> Result<Self, &'static str> {
        let request = Self {
            testmodule: testmodule.into(),
            filename: filename.into(),
            points,
            minimum,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn from_json(raw: &str) -> Result<Self, RequestError> {
        let request: Self = serde_json::from_str(raw)?;
        request.validate().map_err(RequestError::Invalid)?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.testmodule.is_empty() {
            return Err("testmodule must not be empty");
        }
        if self.filename.is_empty() {
            return Err("filename must not be empty");
        }
        if self.points.is_empty() {
            return Err("points must not be empty");
        }
        if !(0.0..100.0).contains(&self.minimum) {
            return Err("minimum must be at least 0 and below 100");
        }
        Ok(())
    }

    /// Name of the test module the student uploaded.
    pub fn testmodule(&self) -> &str {
        &self.testmodule
    }

    /// Name of the file coverage is checked for, without extension.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn points(&self) -> &[u32] {
        &self.points
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }
}
