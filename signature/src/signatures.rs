// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use log::debug;

use crate::config::{SignatureConfig, DEFAULT_MAX_LAYERS, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::error::{ArtifactError, Result};
use crate::image::ImageSource;
use crate::layer_artifact::LayerSignature;

/// The signatures (or attestations) stored as the layers of one image.
pub struct Signatures<I: ImageSource> {
    image: I,
    max_layers: usize,
    max_payload_size: u64,
}

impl<I: ImageSource> Signatures<I> {
    pub fn new(image: I, max_layers: usize) -> Self {
        Self {
            image,
            max_layers,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    pub fn from_config(image: I, config: &SignatureConfig) -> Self {
        Self {
            image,
            max_layers: config.max_layers,
            max_payload_size: config.max_payload_size,
        }
    }

    pub fn with_max_payload_size(mut self, max_payload_size: u64) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn image(&self) -> &I {
        &self.image
    }

    /// One artifact per manifest layer, in manifest order. Either every
    /// layer resolves or an error is returned; there are no partial results.
    pub fn get(&self) -> Result<Vec<LayerSignature>> {
        let manifest = self
            .image
            .manifest()
            .map_err(|source| ArtifactError::ReadManifest { source })?;

        let count = manifest.layers().len();
        if count > self.max_layers {
            return Err(ArtifactError::MaxLayersExceeded {
                count,
                max: self.max_layers,
            });
        }
        debug!("enumerating {count} signature layers");

        let mut signatures = Vec::with_capacity(count);
        for desc in manifest.layers() {
            let layer = self.image.layer_by_digest(desc.digest()).map_err(|source| {
                ArtifactError::ResolveLayer {
                    digest: desc.digest().to_string(),
                    source,
                }
            })?;
            signatures.push(LayerSignature::new(
                layer,
                desc.clone(),
                self.max_payload_size,
            ));
        }

        Ok(signatures)
    }
}

impl<I: ImageSource> From<I> for Signatures<I> {
    fn from(image: I) -> Self {
        Self::new(image, DEFAULT_MAX_LAYERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{Annotations, SIG_ANNOTATION_KEY, SIMPLE_SIGNING_MEDIA_TYPE};
    use crate::artifact::{PayloadProvider, SigningArtifact};
    use crate::image::{Layer, MemoryImage, MemoryLayer, EMPTY_CONFIG_MEDIA_TYPE};
    use oci_spec::image::{Descriptor, ImageManifest, ImageManifestBuilder, MediaType};
    use rstest::rstest;

    fn signature_image(count: usize) -> MemoryImage {
        let layers = (0..count)
            .map(|i| {
                let layer = MemoryLayer::new(
                    format!("{{\"payload\":{i}}}").into_bytes(),
                    MediaType::from(SIMPLE_SIGNING_MEDIA_TYPE),
                )
                .unwrap();
                let annotations = Annotations::from([(
                    SIG_ANNOTATION_KEY.to_string(),
                    format!("sig-{i}"),
                )]);
                (layer, annotations)
            })
            .collect();
        MemoryImage::new(layers).unwrap()
    }

    /// A manifest listing the same blob `count` times.
    fn inflated_manifest(layer: &MemoryLayer, count: usize) -> ImageManifest {
        let desc: Descriptor = layer.descriptor(Annotations::new()).unwrap();
        let config = MemoryLayer::new(b"{}".to_vec(), MediaType::from(EMPTY_CONFIG_MEDIA_TYPE))
            .unwrap()
            .descriptor(Annotations::new())
            .unwrap();
        ImageManifestBuilder::default()
            .schema_version(2u32)
            .config(config)
            .layers(vec![desc; count])
            .build()
            .unwrap()
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    fn test_one_artifact_per_layer_in_order(#[case] count: usize) {
        let image = signature_image(count);
        let manifest = image.manifest().unwrap();
        let signatures = Signatures::new(image, DEFAULT_MAX_LAYERS).get().unwrap();

        assert_eq!(signatures.len(), count);
        for (i, (sig, desc)) in signatures.iter().zip(manifest.layers()).enumerate() {
            assert_eq!(sig.digest().unwrap(), *desc.digest());
            assert_eq!(sig.media_type().unwrap(), *desc.media_type());
            assert_eq!(sig.base64_signature().unwrap(), format!("sig-{i}"));
            assert_eq!(
                sig.payload().unwrap(),
                format!("{{\"payload\":{i}}}").into_bytes()
            );
        }
    }

    #[rstest]
    #[case(3, 3, true)]
    #[case(4, 3, false)]
    #[case(1000, 1000, true)]
    #[case(1001, 1000, false)]
    fn test_layer_cap(#[case] count: usize, #[case] max: usize, #[case] ok: bool) {
        let layer = MemoryLayer::new(b"{}".to_vec(), MediaType::from("a/b")).unwrap();
        let image = MemoryImage::from_parts(inflated_manifest(&layer, count), vec![layer]);

        match Signatures::new(image, max).get() {
            Ok(signatures) => {
                assert!(ok);
                assert_eq!(signatures.len(), count);
            }
            Err(ArtifactError::MaxLayersExceeded { count: got, max: cap }) => {
                assert!(!ok);
                assert_eq!(got, count);
                assert_eq!(cap, max);
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_layer_cap_message() {
        let layer = MemoryLayer::new(b"{}".to_vec(), MediaType::from("a/b")).unwrap();
        let image = MemoryImage::from_parts(inflated_manifest(&layer, 1001), vec![layer]);
        let err = Signatures::from(image).get().unwrap_err();
        assert_eq!(
            err.to_string(),
            "number of layers (1001) exceeded the limit (1000)"
        );
    }

    #[test]
    fn test_unresolvable_layer_aborts() {
        let good = MemoryLayer::new(b"good".to_vec(), MediaType::from("a/b")).unwrap();
        let missing = MemoryLayer::new(b"missing".to_vec(), MediaType::from("a/b")).unwrap();
        let mut manifest = inflated_manifest(&good, 2);
        let mut layers = manifest.layers().clone();
        layers.push(missing.descriptor(Annotations::new()).unwrap());
        manifest.set_layers(layers);

        let image = MemoryImage::from_parts(manifest, vec![good]);
        let err = Signatures::new(image, 10).get().unwrap_err();
        match err {
            ArtifactError::ResolveLayer { digest, .. } => {
                assert_eq!(digest, missing.digest().unwrap().to_string())
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_from_config() {
        let config = SignatureConfig {
            max_layers: 1,
            max_payload_size: 2,
        };
        let err = Signatures::from_config(signature_image(2), &config)
            .get()
            .unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::MaxLayersExceeded { count: 2, max: 1 }
        ));

        let signatures = Signatures::from_config(signature_image(1), &config)
            .get()
            .unwrap();
        assert!(matches!(
            signatures[0].payload(),
            Err(ArtifactError::PayloadTooLarge { max: 2, .. })
        ));
    }
}
