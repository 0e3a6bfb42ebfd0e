//! Per-sample outcomes reported from a run

use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome for one sample on one plate of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResult {
    #[serde(rename = "sampleID", default)]
    pub sample_id: String,
    #[serde(rename = "runID", default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(rename = "protocolID", default, skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<String>,
    #[serde(rename = "plateID", default, skip_serializing_if = "Option::is_none")]
    pub plate_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_row: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_col: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub witnesses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plate_lots: Vec<String>,

    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_on: Option<DateTime<Utc>>,
}
