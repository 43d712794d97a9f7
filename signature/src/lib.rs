// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Signatures and attestations attached to OCI images.
//!
//! A signature image stores one signing artifact per layer. This crate
//! enumerates those layers into [`SigningArtifact`]s, builds artifacts from
//! bytes in memory ([`StaticSignature`]) and extracts the in-toto statement
//! carried by an attestation ([`attestation::attestation_to_payload_json`]).
//! Verifying signatures, certificates and transparency log entries is left
//! to the caller.

pub mod annotations;
pub mod artifact;
pub mod attestation;
pub mod bundle;
pub mod config;
pub mod decoder;
pub mod digest;
pub mod error;
pub mod image;
pub mod layer_artifact;
pub mod layout;
pub mod signatures;
pub mod static_artifact;

pub use artifact::{PayloadProvider, SigningArtifact};
pub use bundle::{RekorBundle, Rfc3161Timestamp};
pub use config::SignatureConfig;
pub use error::{ArtifactError, Result};
pub use image::{ImageSource, Layer};
pub use layer_artifact::LayerSignature;
pub use layout::ImageLayout;
pub use signatures::Signatures;
pub use static_artifact::{StaticOptions, StaticSignature};

// Every backend must expose the full artifact capability set.
const _: fn() = || {
    fn assert_signing_artifact<T: SigningArtifact>() {}
    assert_signing_artifact::<StaticSignature>();
    assert_signing_artifact::<LayerSignature>();
};
