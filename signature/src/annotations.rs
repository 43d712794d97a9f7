// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Cosign stores everything except the payload itself in layer annotations.
//! These helpers decode those annotations and are shared by every
//! [`SigningArtifact`](crate::SigningArtifact) implementation.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use x509_cert::Certificate;

use crate::bundle::{RekorBundle, Rfc3161Timestamp};
use crate::error::{ArtifactError, Result};

pub const SIG_ANNOTATION_KEY: &str = "dev.cosignproject.cosign/signature";
pub const CERTIFICATE_ANNOTATION_KEY: &str = "dev.sigstore.cosign/certificate";
pub const CHAIN_ANNOTATION_KEY: &str = "dev.sigstore.cosign/chain";
pub const BUNDLE_ANNOTATION_KEY: &str = "dev.sigstore.cosign/bundle";
pub const RFC3161_TIMESTAMP_ANNOTATION_KEY: &str = "dev.sigstore.cosign/rfc3161timestamp";

pub const SIMPLE_SIGNING_MEDIA_TYPE: &str = "application/vnd.dev.cosign.simplesigning.v1+json";
pub const DSSE_MEDIA_TYPE: &str = "application/vnd.dsse.envelope.v1+json";
pub const INTOTO_PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

pub type Annotations = HashMap<String, String>;

fn non_empty<'a>(annotations: &'a Annotations, key: &str) -> Option<&'a str> {
    annotations
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

pub(crate) fn decode_signature(b64sig: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(b64sig)
        .map_err(|source| ArtifactError::Base64DecodeFailed {
            source,
            context: "decode signature",
        })
}

pub(crate) fn load_certificates(pem: &[u8], context: &'static str) -> Result<Vec<Certificate>> {
    Certificate::load_pem_chain(pem)
        .map_err(|source| ArtifactError::CertificateMalformed { source, context })
}

/// Leaf certificate, `None` when the annotation is absent.
pub(crate) fn cert_from_annotations(annotations: &Annotations) -> Result<Option<Certificate>> {
    let Some(pem) = non_empty(annotations, CERTIFICATE_ANNOTATION_KEY) else {
        return Ok(None);
    };
    let certs = load_certificates(pem.as_bytes(), "load leaf certificate")?;
    Ok(certs.into_iter().next())
}

/// Certificate chain in leaf to root order, empty when the annotation is absent.
pub(crate) fn chain_from_annotations(annotations: &Annotations) -> Result<Vec<Certificate>> {
    match non_empty(annotations, CHAIN_ANNOTATION_KEY) {
        Some(pem) => load_certificates(pem.as_bytes(), "load certificate chain"),
        None => Ok(Vec::new()),
    }
}

pub(crate) fn bundle_from_annotations(annotations: &Annotations) -> Result<Option<RekorBundle>> {
    let Some(json) = non_empty(annotations, BUNDLE_ANNOTATION_KEY) else {
        return Ok(None);
    };
    let bundle: RekorBundle =
        serde_json::from_str(json).map_err(|source| ArtifactError::JsonDecodeFailed {
            source,
            context: "bundle",
        })?;
    bundle.validate_shape()?;
    Ok(Some(bundle))
}

pub(crate) fn timestamp_from_annotations(
    annotations: &Annotations,
) -> Result<Option<Rfc3161Timestamp>> {
    let Some(json) = non_empty(annotations, RFC3161_TIMESTAMP_ANNOTATION_KEY) else {
        return Ok(None);
    };
    let timestamp: Rfc3161Timestamp =
        serde_json::from_str(json).map_err(|source| ArtifactError::JsonDecodeFailed {
            source,
            context: "RFC3161 timestamp bundle",
        })?;
    timestamp.validate_shape()?;
    Ok(Some(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(key: &str, value: &str) -> Annotations {
        HashMap::from([(key.to_string(), value.to_string())])
    }

    #[test]
    fn test_absent_is_not_an_error() {
        let empty = Annotations::new();
        assert!(cert_from_annotations(&empty).unwrap().is_none());
        assert!(chain_from_annotations(&empty).unwrap().is_empty());
        assert!(bundle_from_annotations(&empty).unwrap().is_none());
        assert!(timestamp_from_annotations(&empty).unwrap().is_none());

        let blank = annotations(BUNDLE_ANNOTATION_KEY, "");
        assert!(bundle_from_annotations(&blank).unwrap().is_none());
    }

    #[test]
    fn test_malformed_is_an_error() {
        let bundle = annotations(BUNDLE_ANNOTATION_KEY, "{not json");
        let err = bundle_from_annotations(&bundle).unwrap_err();
        assert!(err.to_string().contains("unmarshaling bundle"));

        let timestamp = annotations(RFC3161_TIMESTAMP_ANNOTATION_KEY, "[]");
        let err = timestamp_from_annotations(&timestamp).unwrap_err();
        assert!(err
            .to_string()
            .contains("unmarshaling RFC3161 timestamp bundle"));

        let cert = annotations(
            CERTIFICATE_ANNOTATION_KEY,
            "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n",
        );
        assert!(matches!(
            cert_from_annotations(&cert),
            Err(ArtifactError::CertificateMalformed { .. })
        ));
    }

    #[test]
    fn test_decode_signature() {
        assert_eq!(decode_signature("c2ln").unwrap(), b"sig");
        assert!(decode_signature("shou!ln'twork").is_err());
        assert!(decode_signature("").unwrap().is_empty());
    }
}
