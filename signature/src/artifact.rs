// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Signing artifacts
//!
//! A signing artifact is one signature or attestation attached to an OCI
//! image. Whatever backend stores it, an artifact exposes the same set of
//! accessors. Every accessor is fallible and independent of the others.
//!
//! Optional verification material (certificate, bundle, timestamp) reports
//! "not attached" as `Ok(None)` (or an empty chain), which is never conflated
//! with a decoding error.
//!
//! [`PayloadProvider`] is the narrowest capability: only the raw payload.
//! Consumers that only need the payload, like the attestation pipeline,
//! accept any provider so that content can come from other transports.

use std::io::Read;

use oci_spec::image::{Digest, MediaType};
use x509_cert::Certificate;

use crate::annotations::Annotations;
use crate::bundle::{RekorBundle, Rfc3161Timestamp};
use crate::error::Result;

pub trait PayloadProvider {
    /// The exact bytes stored for this artifact, without normalization.
    fn payload(&self) -> Result<Vec<u8>>;
}

pub trait SigningArtifact: PayloadProvider + Send + Sync {
    fn annotations(&self) -> Result<Annotations>;

    /// Raw signature bytes, decoded from [`SigningArtifact::base64_signature`].
    fn signature(&self) -> Result<Vec<u8>>;

    fn base64_signature(&self) -> Result<String>;

    /// Leaf certificate of the signer, if one is attached.
    fn cert(&self) -> Result<Option<Certificate>>;

    /// Certificate chain from the leaf's issuer to the root.
    fn chain(&self) -> Result<Vec<Certificate>>;

    fn bundle(&self) -> Result<Option<RekorBundle>>;

    fn rfc3161_timestamp(&self) -> Result<Option<Rfc3161Timestamp>>;

    fn digest(&self) -> Result<Digest>;

    fn diff_id(&self) -> Result<Digest>;

    fn compressed(&self) -> Result<Box<dyn Read + Send + '_>>;

    fn uncompressed(&self) -> Result<Box<dyn Read + Send + '_>>;

    fn size(&self) -> Result<u64>;

    fn media_type(&self) -> Result<MediaType>;
}
