// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use std::fmt;
use std::io::Read;

use oci_spec::image::{Descriptor, Digest, MediaType};
use x509_cert::Certificate;

use crate::annotations::{
    bundle_from_annotations, cert_from_annotations, chain_from_annotations, decode_signature,
    timestamp_from_annotations, Annotations, SIG_ANNOTATION_KEY,
};
use crate::artifact::{PayloadProvider, SigningArtifact};
use crate::bundle::{RekorBundle, Rfc3161Timestamp};
use crate::error::{ArtifactError, Result};
use crate::image::Layer;

/// A signature stored as one layer of a signature image. The descriptor from
/// the manifest supplies the metadata, the layer supplies the bytes.
pub struct LayerSignature {
    layer: Box<dyn Layer>,
    desc: Descriptor,
    max_payload_size: u64,
}

impl LayerSignature {
    pub fn new(layer: Box<dyn Layer>, desc: Descriptor, max_payload_size: u64) -> Self {
        Self {
            layer,
            desc,
            max_payload_size,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    fn descriptor_annotations(&self) -> Annotations {
        self.desc.annotations().clone().unwrap_or_default()
    }
}

impl fmt::Debug for LayerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerSignature")
            .field("desc", &self.desc)
            .field("max_payload_size", &self.max_payload_size)
            .finish_non_exhaustive()
    }
}

impl PayloadProvider for LayerSignature {
    fn payload(&self) -> Result<Vec<u8>> {
        let size = self.desc.size();
        if size > self.max_payload_size {
            return Err(ArtifactError::PayloadTooLarge {
                size,
                max: self.max_payload_size,
            });
        }

        // Read one byte past the declared size so that a blob longer than
        // its descriptor is detected without reading it all.
        let mut payload = Vec::with_capacity(size as usize);
        self.layer
            .compressed()?
            .take(size + 1)
            .read_to_end(&mut payload)?;

        let read = payload.len() as u64;
        if read != size {
            return Err(ArtifactError::PayloadSizeMismatch {
                declared: size,
                read,
            });
        }

        Ok(payload)
    }
}

impl SigningArtifact for LayerSignature {
    fn annotations(&self) -> Result<Annotations> {
        Ok(self.descriptor_annotations())
    }

    fn signature(&self) -> Result<Vec<u8>> {
        decode_signature(&self.base64_signature()?)
    }

    fn base64_signature(&self) -> Result<String> {
        self.desc
            .annotations()
            .as_ref()
            .and_then(|annotations| annotations.get(SIG_ANNOTATION_KEY))
            .cloned()
            .ok_or_else(|| ArtifactError::MissingAnnotation {
                digest: self.desc.digest().to_string(),
                key: SIG_ANNOTATION_KEY,
            })
    }

    fn cert(&self) -> Result<Option<Certificate>> {
        cert_from_annotations(&self.descriptor_annotations())
    }

    fn chain(&self) -> Result<Vec<Certificate>> {
        chain_from_annotations(&self.descriptor_annotations())
    }

    fn bundle(&self) -> Result<Option<RekorBundle>> {
        bundle_from_annotations(&self.descriptor_annotations())
    }

    fn rfc3161_timestamp(&self) -> Result<Option<Rfc3161Timestamp>> {
        timestamp_from_annotations(&self.descriptor_annotations())
    }

    fn digest(&self) -> Result<Digest> {
        Ok(self.desc.digest().clone())
    }

    fn diff_id(&self) -> Result<Digest> {
        Ok(self.layer.diff_id()?)
    }

    fn compressed(&self) -> Result<Box<dyn Read + Send + '_>> {
        Ok(self.layer.compressed()?)
    }

    fn uncompressed(&self) -> Result<Box<dyn Read + Send + '_>> {
        Ok(self.layer.uncompressed()?)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.desc.size())
    }

    fn media_type(&self) -> Result<MediaType> {
        Ok(self.desc.media_type().clone())
    }
}
