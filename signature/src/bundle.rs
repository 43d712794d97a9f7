// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Verification material carried next to a signature: the Rekor transparency
//! log record and the RFC3161 timestamp. Only the shape of this data is
//! checked here, the cryptography belongs to the verifier.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use crate::error::{ArtifactError, Result};

/// Record of a signature's inclusion in the Rekor transparency log.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RekorBundle {
    /// Signed entry timestamp (SET) issued by the log.
    #[serde_as(as = "Base64")]
    #[serde(rename = "SignedEntryTimestamp")]
    pub signed_entry_timestamp: Vec<u8>,

    #[serde(rename = "Payload")]
    pub payload: RekorPayload,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RekorPayload {
    /// Canonicalized log entry body, as returned by the log.
    pub body: serde_json::Value,

    #[serde(rename = "integratedTime")]
    pub integrated_time: i64,

    #[serde(rename = "logIndex")]
    pub log_index: i64,

    #[serde(rename = "logID")]
    pub log_id: String,

    #[serde(
        rename = "inclusionProof",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inclusion_proof: Option<InclusionProof>,
}

/// Merkle inclusion proof material of a log entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    pub log_index: i64,
    pub root_hash: String,
    pub tree_size: i64,
    #[serde(default)]
    pub hashes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
}

impl RekorBundle {
    pub fn validate_shape(&self) -> Result<()> {
        if self.signed_entry_timestamp.is_empty() {
            return Err(ArtifactError::MalformedBundle("empty signed entry timestamp"));
        }

        if self.payload.log_index < 0 {
            return Err(ArtifactError::MalformedBundle("negative log index"));
        }

        if let Some(proof) = &self.payload.inclusion_proof {
            if proof.log_index < 0 || proof.log_index >= proof.tree_size {
                return Err(ArtifactError::MalformedBundle(
                    "inclusion proof log index outside of tree",
                ));
            }
            if proof.root_hash.is_empty() {
                return Err(ArtifactError::MalformedBundle("inclusion proof without root hash"));
            }
        }

        Ok(())
    }
}

/// A signed RFC3161 timestamp token over the signature.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rfc3161Timestamp {
    #[serde_as(as = "Base64")]
    #[serde(rename = "SignedRFC3161Timestamp")]
    pub signed_rfc3161_timestamp: Vec<u8>,
}

impl Rfc3161Timestamp {
    pub fn validate_shape(&self) -> Result<()> {
        if self.signed_rfc3161_timestamp.is_empty() {
            return Err(ArtifactError::MalformedBundle("empty RFC3161 timestamp token"));
        }
        Ok(())
    }
}
