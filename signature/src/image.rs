// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Storage collaborator
//!
//! Signatures live as layers of an OCI image. Where that image physically
//! lives (a registry, an OCI image layout on disk, memory) is hidden behind
//! two traits:
//! - [`ImageSource`]: reads the manifest and resolves a layer by digest.
//! - [`Layer`]: a content-addressed blob that can be streamed.
//!
//! Errors raised by the backends are carried as [`anyhow::Error`].

use std::collections::HashMap;
use std::io::{Cursor, Read};

use anyhow::{anyhow, Result};
use oci_spec::image::{
    Descriptor, DescriptorBuilder, Digest, ImageManifest, ImageManifestBuilder, MediaType,
};

use crate::annotations::Annotations;
use crate::digest::{parse_digest, sha256_digest};

/// Schema version of OCI image manifests.
pub const MANIFEST_SCHEMA_VERSION: u32 = 2;

/// Media type of the empty config blob cosign uses for signature images.
pub const EMPTY_CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.image.config.v1+json";

pub trait Layer: Send + Sync {
    /// Digest of the layer as stored (compressed) form.
    fn digest(&self) -> Result<Digest>;

    /// Digest of the uncompressed layer content.
    fn diff_id(&self) -> Result<Digest>;

    fn compressed(&self) -> Result<Box<dyn Read + Send + '_>>;

    fn uncompressed(&self) -> Result<Box<dyn Read + Send + '_>>;

    fn size(&self) -> Result<u64>;

    fn media_type(&self) -> Result<MediaType>;
}

pub trait ImageSource: Send + Sync {
    fn manifest(&self) -> Result<ImageManifest>;

    fn layer_by_digest(&self, digest: &Digest) -> Result<Box<dyn Layer>>;
}

/// An uncompressed layer held in memory.
#[derive(Clone, Debug)]
pub struct MemoryLayer {
    data: Vec<u8>,
    digest: Digest,
    media_type: MediaType,
}

impl MemoryLayer {
    pub fn new(data: Vec<u8>, media_type: MediaType) -> crate::Result<Self> {
        let digest = parse_digest(&sha256_digest(&data))?;
        Ok(Self {
            data,
            digest,
            media_type,
        })
    }

    pub fn descriptor(&self, annotations: Annotations) -> crate::Result<Descriptor> {
        let mut builder = DescriptorBuilder::default()
            .media_type(self.media_type.clone())
            .digest(self.digest.clone())
            .size(self.data.len() as u64);
        if !annotations.is_empty() {
            builder = builder.annotations(annotations);
        }
        Ok(builder.build()?)
    }
}

impl Layer for MemoryLayer {
    fn digest(&self) -> Result<Digest> {
        Ok(self.digest.clone())
    }

    fn diff_id(&self) -> Result<Digest> {
        Ok(self.digest.clone())
    }

    fn compressed(&self) -> Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(Cursor::new(self.data.as_slice())))
    }

    fn uncompressed(&self) -> Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(Cursor::new(self.data.as_slice())))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn media_type(&self) -> Result<MediaType> {
        Ok(self.media_type.clone())
    }
}

/// A signature image assembled in memory, e.g. by tooling that has already
/// fetched the blobs, or by tests.
#[derive(Clone, Debug)]
pub struct MemoryImage {
    manifest: ImageManifest,
    layers: HashMap<String, MemoryLayer>,
}

impl MemoryImage {
    /// Build an image whose manifest lists the given layers in order.
    pub fn new(layers: Vec<(MemoryLayer, Annotations)>) -> crate::Result<Self> {
        let config = MemoryLayer::new(b"{}".to_vec(), MediaType::from(EMPTY_CONFIG_MEDIA_TYPE))?;
        let mut descriptors = Vec::with_capacity(layers.len());
        let mut blobs = HashMap::new();
        for (layer, annotations) in layers {
            descriptors.push(layer.descriptor(annotations)?);
            blobs.insert(layer.digest.to_string(), layer);
        }

        let manifest = ImageManifestBuilder::default()
            .schema_version(MANIFEST_SCHEMA_VERSION)
            .media_type(MediaType::ImageManifest)
            .config(config.descriptor(Annotations::new())?)
            .layers(descriptors)
            .build()?;

        Ok(Self {
            manifest,
            layers: blobs,
        })
    }

    /// Pair an arbitrary manifest with a set of blobs. Layers the manifest
    /// references but `layers` lacks fail to resolve.
    pub fn from_parts(manifest: ImageManifest, layers: Vec<MemoryLayer>) -> Self {
        let layers = layers
            .into_iter()
            .map(|layer| (layer.digest.to_string(), layer))
            .collect();
        Self { manifest, layers }
    }
}

impl ImageSource for MemoryImage {
    fn manifest(&self) -> Result<ImageManifest> {
        Ok(self.manifest.clone())
    }

    fn layer_by_digest(&self, digest: &Digest) -> Result<Box<dyn Layer>> {
        let layer = self
            .layers
            .get(&digest.to_string())
            .ok_or_else(|| anyhow!("blob {digest} not found"))?;
        Ok(Box::new(layer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_image_manifest_order() {
        let first = MemoryLayer::new(b"first".to_vec(), MediaType::from("a/b")).unwrap();
        let second = MemoryLayer::new(b"second".to_vec(), MediaType::from("c/d")).unwrap();
        let image = MemoryImage::new(vec![
            (first.clone(), Annotations::new()),
            (second.clone(), Annotations::new()),
        ])
        .unwrap();

        let manifest = image.manifest().unwrap();
        let digests: Vec<String> = manifest
            .layers()
            .iter()
            .map(|desc| desc.digest().to_string())
            .collect();
        assert_eq!(
            digests,
            vec![first.digest.to_string(), second.digest.to_string()]
        );

        let resolved = image.layer_by_digest(&second.digest).unwrap();
        assert_eq!(resolved.size().unwrap(), 6);
        assert!(image
            .layer_by_digest(manifest.config().digest())
            .is_err());
    }
}
