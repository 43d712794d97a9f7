// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArtifactError>;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to read image manifest")]
    ReadManifest {
        #[source]
        source: anyhow::Error,
    },

    #[error("number of layers ({count}) exceeded the limit ({max})")]
    MaxLayersExceeded { count: usize, max: usize },

    #[error("failed to resolve layer {digest}")]
    ResolveLayer {
        digest: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("signature layer {digest} is missing {key:?} annotation")]
    MissingAnnotation { digest: String, key: &'static str },

    #[error("base64 decoding failed when {context}")]
    Base64DecodeFailed {
        #[source]
        source: base64::DecodeError,
        context: &'static str,
    },

    #[error("malformed certificate when {context}")]
    CertificateMalformed {
        #[source]
        source: x509_cert::der::Error,
        context: &'static str,
    },

    #[error("unmarshaling {context}")]
    JsonDecodeFailed {
        #[source]
        source: serde_json::Error,
        context: &'static str,
    },

    #[error("malformed bundle: {0}")]
    MalformedBundle(&'static str),

    #[error("payload size {size} exceeds the limit ({max})")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("payload size mismatch: declared {declared}, read {read}")]
    PayloadSizeMismatch { declared: u64, read: u64 },

    #[error("blob {digest} has size {actual}, its descriptor declares {declared}")]
    BlobSizeMismatch {
        digest: String,
        declared: u64,
        actual: u64,
    },

    #[error("blob {digest} does not match its content digest {actual}")]
    DigestMismatch { digest: String, actual: String },

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigestAlgorithm(String),

    #[error("{representation} is not available for media type {media_type}")]
    Unavailable {
        representation: &'static str,
        media_type: String,
    },

    #[error("invalid OCI image layout: {0}")]
    InvalidLayout(String),

    #[error("OCI spec error: {0}")]
    OciSpec(#[from] oci_spec::OciSpecError),

    #[error("IO Operation Failed: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
