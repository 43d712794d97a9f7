// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Attestation payloads
//!
//! Turns the raw bytes of an attestation (a DSSE envelope wrapping a base64
//! encoded in-toto statement) into the statement JSON plus its effective
//! predicate type, ready to be handed to a policy engine.
//!
//! The stages run in a fixed order and the first failure ends the call:
//! 1. fetch the bytes from a [`PayloadProvider`]
//! 2. parse the envelope
//! 3. require a non-empty `payload`
//! 4. base64 decode it
//! 5. parse the statement and resolve its predicate type

pub mod envelope;
pub mod predicate;
pub mod statement;

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, warn};
use thiserror::Error;

use crate::artifact::PayloadProvider;
use crate::error::ArtifactError;

pub use envelope::{Envelope, EnvelopeSignature};
pub use predicate::{CosignPredicate, CosignVulnPredicate, PredicateKind, PredicateTypeRegistry};
pub use statement::{Statement, Subject};

pub type Result<T> = std::result::Result<T, AttestationError>;

#[derive(Error, Debug)]
pub enum AttestationError {
    #[error("missing predicate type")]
    MissingPredicateType,

    #[error(transparent)]
    PayloadRetrieval(#[from] ArtifactError),

    #[error("unmarshaling payload data: {source}")]
    UnmarshalEnvelope {
        #[source]
        source: serde_json::Error,
    },

    #[error("could not find payload")]
    CouldNotFindPayload,

    #[error("decoding payload: {source}")]
    DecodingPayload {
        #[source]
        source: base64::DecodeError,
    },

    #[error("envelope has no payloadType")]
    MissingPayloadType,

    #[error("unmarshal in-toto statement: {source}")]
    UnmarshalStatement {
        #[source]
        source: serde_json::Error,
    },

    #[error("serializing in-toto statement: {source}")]
    SerializeStatement {
        #[source]
        source: serde_json::Error,
    },
}

/// Extract the in-toto statement carried by an attestation.
///
/// `predicate_type` is a short name (`custom`, `vuln`, ...) or a URI. It is
/// only used when the statement itself does not declare a predicate type,
/// and is then reported through the return value; the emitted statement is
/// never altered.
///
/// Returns the statement as JSON with sorted object keys and the effective
/// predicate type URI.
pub fn attestation_to_payload_json<P>(
    registry: &PredicateTypeRegistry,
    predicate_type: &str,
    provider: &P,
) -> Result<(Vec<u8>, String)>
where
    P: PayloadProvider + ?Sized,
{
    if predicate_type.is_empty() {
        return Err(AttestationError::MissingPredicateType);
    }

    let payload = provider.payload()?;

    let envelope: Envelope = serde_json::from_slice(&payload)
        .map_err(|source| AttestationError::UnmarshalEnvelope { source })?;

    let encoded = match envelope.payload.as_deref() {
        Some(encoded) if !encoded.is_empty() => encoded,
        _ => return Err(AttestationError::CouldNotFindPayload),
    };

    let decoded = STANDARD
        .decode(encoded)
        .map_err(|source| AttestationError::DecodingPayload { source })?;

    if envelope.payload_type.as_deref().unwrap_or_default().is_empty() {
        return Err(AttestationError::MissingPayloadType);
    }

    let statement: Statement = serde_json::from_slice(&decoded)
        .map_err(|source| AttestationError::UnmarshalStatement { source })?;

    let hinted = registry.resolve(predicate_type);
    let resolved = if statement.predicate_type.is_empty() {
        debug!("statement declares no predicate type, using {hinted}");
        hinted
    } else {
        if statement.predicate_type != hinted {
            warn!(
                "statement declares predicate type {}, requested {predicate_type}",
                statement.predicate_type
            );
        }
        statement.predicate_type.as_str()
    };

    // Going through `Value` sorts the object keys, so the output depends
    // only on the statement content.
    let json = serde_json::to_value(&statement)
        .and_then(|value| serde_json::to_vec(&value))
        .map_err(|source| AttestationError::SerializeStatement { source })?;

    debug!("resolved predicate type {resolved}");
    Ok((json, resolved.to_string()))
}
