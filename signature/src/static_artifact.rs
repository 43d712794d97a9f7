// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use std::io::{Cursor, Read};
use std::sync::{Mutex, OnceLock};

use oci_spec::image::{Digest, MediaType};
use x509_cert::Certificate;

use crate::annotations::{
    cert_from_annotations, chain_from_annotations, decode_signature, Annotations,
    BUNDLE_ANNOTATION_KEY, CERTIFICATE_ANNOTATION_KEY, CHAIN_ANNOTATION_KEY, DSSE_MEDIA_TYPE,
    RFC3161_TIMESTAMP_ANNOTATION_KEY, SIG_ANNOTATION_KEY, SIMPLE_SIGNING_MEDIA_TYPE,
};
use crate::artifact::{PayloadProvider, SigningArtifact};
use crate::bundle::{RekorBundle, Rfc3161Timestamp};
use crate::decoder::Compression;
use crate::digest::{digest_reader, parse_digest, sha256_digest, LayerDigestHasher};
use crate::error::{ArtifactError, Result};

/// Out-of-band metadata for a [`StaticSignature`].
#[derive(Clone, Debug, Default)]
pub struct StaticOptions {
    layer_media_type: Option<MediaType>,
    annotations: Annotations,
    bundle: Option<RekorBundle>,
    rfc3161_timestamp: Option<Rfc3161Timestamp>,
    cert: Option<String>,
    chain: Option<String>,
}

impl StaticOptions {
    pub fn with_layer_media_type(mut self, media_type: MediaType) -> Self {
        self.layer_media_type = Some(media_type);
        self
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_bundle(mut self, bundle: RekorBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn with_rfc3161_timestamp(mut self, timestamp: Rfc3161Timestamp) -> Self {
        self.rfc3161_timestamp = Some(timestamp);
        self
    }

    /// PEM encoded leaf certificate and chain.
    pub fn with_cert_chain(mut self, cert: impl Into<String>, chain: impl Into<String>) -> Self {
        self.cert = Some(cert.into());
        self.chain = Some(chain.into());
        self
    }

    /// The annotations a layer carrying these options would have.
    fn layer_annotations(&self, b64sig: &str) -> Result<Annotations> {
        let mut annotations = self.annotations.clone();
        annotations.insert(SIG_ANNOTATION_KEY.to_string(), b64sig.to_string());

        if let Some(cert) = &self.cert {
            annotations.insert(CERTIFICATE_ANNOTATION_KEY.to_string(), cert.clone());
        }
        if let Some(chain) = &self.chain {
            annotations.insert(CHAIN_ANNOTATION_KEY.to_string(), chain.clone());
        }
        if let Some(bundle) = &self.bundle {
            let json = serde_json::to_string(bundle).map_err(|source| {
                ArtifactError::JsonDecodeFailed {
                    source,
                    context: "bundle",
                }
            })?;
            annotations.insert(BUNDLE_ANNOTATION_KEY.to_string(), json);
        }
        if let Some(timestamp) = &self.rfc3161_timestamp {
            let json = serde_json::to_string(timestamp).map_err(|source| {
                ArtifactError::JsonDecodeFailed {
                    source,
                    context: "RFC3161 timestamp bundle",
                }
            })?;
            annotations.insert(RFC3161_TIMESTAMP_ANNOTATION_KEY.to_string(), json);
        }

        Ok(annotations)
    }
}

/// A signature or attestation built purely from bytes already in hand.
/// No I/O is ever performed; the digest and diff-ID are computed on first
/// use and cached.
#[derive(Debug)]
pub struct StaticSignature {
    payload: Vec<u8>,
    b64sig: String,
    media_type: MediaType,
    annotations: Annotations,
    bundle: Option<RekorBundle>,
    rfc3161_timestamp: Option<Rfc3161Timestamp>,

    digest: OnceLock<String>,
    diff_id: Mutex<Option<String>>,
}

impl StaticSignature {
    pub fn new(payload: impl Into<Vec<u8>>, b64sig: impl Into<String>) -> Self {
        let b64sig = b64sig.into();
        let annotations = Annotations::from([(SIG_ANNOTATION_KEY.to_string(), b64sig.clone())]);
        Self {
            payload: payload.into(),
            b64sig,
            media_type: MediaType::from(SIMPLE_SIGNING_MEDIA_TYPE),
            annotations,
            bundle: None,
            rfc3161_timestamp: None,
            digest: OnceLock::new(),
            diff_id: Mutex::new(None),
        }
    }

    pub fn with_options(
        payload: impl Into<Vec<u8>>,
        b64sig: impl Into<String>,
        options: StaticOptions,
    ) -> Result<Self> {
        let b64sig = b64sig.into();
        let annotations = options.layer_annotations(&b64sig)?;
        Ok(Self {
            payload: payload.into(),
            b64sig,
            media_type: options
                .layer_media_type
                .unwrap_or_else(|| MediaType::from(SIMPLE_SIGNING_MEDIA_TYPE)),
            annotations,
            bundle: options.bundle,
            rfc3161_timestamp: options.rfc3161_timestamp,
            digest: OnceLock::new(),
            diff_id: Mutex::new(None),
        })
    }

    /// An unsigned DSSE attestation.
    pub fn new_attestation(payload: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_options(
            payload,
            "",
            StaticOptions::default().with_layer_media_type(MediaType::from(DSSE_MEDIA_TYPE)),
        )
    }

    /// Materialize any artifact into memory, e.g. to detach it from the
    /// backend it was read from.
    pub fn copy_from(artifact: &dyn SigningArtifact) -> Result<Self> {
        let mut options = StaticOptions::default()
            .with_layer_media_type(artifact.media_type()?)
            .with_annotations(artifact.annotations()?);
        if let Some(bundle) = artifact.bundle()? {
            options = options.with_bundle(bundle);
        }
        if let Some(timestamp) = artifact.rfc3161_timestamp()? {
            options = options.with_rfc3161_timestamp(timestamp);
        }

        Self::with_options(artifact.payload()?, artifact.base64_signature()?, options)
    }

    fn compression(&self) -> Result<Compression> {
        Compression::try_from(self.media_type.to_string().as_str())
    }
}

impl PayloadProvider for StaticSignature {
    fn payload(&self) -> Result<Vec<u8>> {
        Ok(self.payload.clone())
    }
}

impl SigningArtifact for StaticSignature {
    fn annotations(&self) -> Result<Annotations> {
        Ok(self.annotations.clone())
    }

    fn signature(&self) -> Result<Vec<u8>> {
        decode_signature(&self.b64sig)
    }

    fn base64_signature(&self) -> Result<String> {
        Ok(self.b64sig.clone())
    }

    fn cert(&self) -> Result<Option<Certificate>> {
        cert_from_annotations(&self.annotations)
    }

    fn chain(&self) -> Result<Vec<Certificate>> {
        chain_from_annotations(&self.annotations)
    }

    fn bundle(&self) -> Result<Option<RekorBundle>> {
        Ok(self.bundle.clone())
    }

    fn rfc3161_timestamp(&self) -> Result<Option<Rfc3161Timestamp>> {
        Ok(self.rfc3161_timestamp.clone())
    }

    fn digest(&self) -> Result<Digest> {
        parse_digest(self.digest.get_or_init(|| sha256_digest(&self.payload)))
    }

    fn diff_id(&self) -> Result<Digest> {
        let compression = self.compression()?;
        if compression == Compression::Uncompressed {
            return self.digest();
        }

        let mut cached = self
            .diff_id
            .lock()
            .map_err(|_| anyhow::anyhow!("diff-ID cache poisoned"))?;
        if let Some(diff_id) = cached.as_deref() {
            return parse_digest(diff_id);
        }

        let hasher = LayerDigestHasher::Sha256(Default::default());
        let diff_id = digest_reader(hasher, &mut self.uncompressed()?)?;
        let parsed = parse_digest(&diff_id)?;
        *cached = Some(diff_id);
        Ok(parsed)
    }

    fn compressed(&self) -> Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(Cursor::new(self.payload.as_slice())))
    }

    fn uncompressed(&self) -> Result<Box<dyn Read + Send + '_>> {
        self.compression()?
            .decompress(Box::new(Cursor::new(self.payload.as_slice())))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.payload.len() as u64)
    }

    fn media_type(&self) -> Result<MediaType> {
        Ok(self.media_type.clone())
    }
}
