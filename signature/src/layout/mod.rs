// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! # OCI image layout
//!
//! Reads signatures and attestations saved to disk as an OCI image layout:
//!
//! ```text
//! <root>/
//! ├── oci-layout
//! ├── index.json
//! └── blobs/<algorithm>/<encoded>
//! ```
//!
//! The index lists one manifest per kind, told apart by the `kind`
//! annotation of the index descriptor.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, warn};
use oci_spec::image::{Descriptor, Digest, ImageIndex, ImageManifest, MediaType};
use serde::Deserialize;

use crate::decoder::Compression;
use crate::digest::{digest_reader, parse_digest, LayerDigestHasher};
use crate::error::{ArtifactError, Result};
use crate::image::{ImageSource, Layer};

pub const OCI_LAYOUT_FILE: &str = "oci-layout";
pub const INDEX_FILE: &str = "index.json";
pub const BLOBS_DIR: &str = "blobs";

pub const KIND_ANNOTATION: &str = "kind";
pub const SIGS_KIND: &str = "dev.cosignproject.cosign/sigs";
pub const ATTS_KIND: &str = "dev.cosignproject.cosign/atts";

const SUPPORTED_LAYOUT_VERSION: &str = "1.0.0";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OciLayout {
    image_layout_version: String,
}

pub struct ImageLayout {
    root: PathBuf,
    index: ImageIndex,
}

impl ImageLayout {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let layout = std::fs::read(root.join(OCI_LAYOUT_FILE))?;
        let layout: OciLayout = serde_json::from_slice(&layout).map_err(|source| {
            ArtifactError::JsonDecodeFailed {
                source,
                context: "oci-layout",
            }
        })?;
        if layout.image_layout_version != SUPPORTED_LAYOUT_VERSION {
            return Err(ArtifactError::InvalidLayout(format!(
                "unsupported imageLayoutVersion {}",
                layout.image_layout_version
            )));
        }

        let index = std::fs::read(root.join(INDEX_FILE))?;
        let index: ImageIndex = serde_json::from_slice(&index).map_err(|source| {
            ArtifactError::JsonDecodeFailed {
                source,
                context: "image index",
            }
        })?;

        debug!("opened OCI image layout at {}", root.display());
        Ok(Self { root, index })
    }

    pub fn index(&self) -> &ImageIndex {
        &self.index
    }

    /// The signature image, if the layout holds one.
    pub fn signatures(&self) -> Result<Option<LayoutImage>> {
        self.image_of_kind(SIGS_KIND)
    }

    /// The attestation image, if the layout holds one.
    pub fn attestations(&self) -> Result<Option<LayoutImage>> {
        self.image_of_kind(ATTS_KIND)
    }

    /// The image whose manifest `desc` points at.
    pub fn image(&self, desc: &Descriptor) -> LayoutImage {
        LayoutImage {
            root: self.root.clone(),
            digest: desc.digest().clone(),
            size: desc.size(),
            manifest: OnceLock::new(),
        }
    }

    fn image_of_kind(&self, kind: &str) -> Result<Option<LayoutImage>> {
        let mut matches = self.index.manifests().iter().filter(|desc| {
            desc.annotations()
                .as_ref()
                .and_then(|annotations| annotations.get(KIND_ANNOTATION))
                .is_some_and(|value| value == kind)
        });

        let Some(desc) = matches.next() else {
            debug!("no {kind} image in layout {}", self.root.display());
            return Ok(None);
        };
        if matches.next().is_some() {
            warn!(
                "layout {} holds more than one {kind} image, using {}",
                self.root.display(),
                desc.digest()
            );
        }

        if *desc.media_type() != MediaType::ImageManifest {
            return Err(ArtifactError::InvalidLayout(format!(
                "{kind} descriptor {} has media type {}, expected an image manifest",
                desc.digest(),
                desc.media_type()
            )));
        }

        Ok(Some(self.image(desc)))
    }
}

/// Path of the blob `digest` under the layout rooted at `root`.
fn blob_path(root: &Path, digest: &Digest) -> Result<PathBuf> {
    let digest = digest.to_string();
    let (algorithm, encoded) = digest
        .split_once(':')
        .ok_or_else(|| ArtifactError::InvalidLayout(format!("malformed digest {digest}")))?;
    if hex::decode(encoded).is_err() {
        return Err(ArtifactError::InvalidLayout(format!(
            "blob name of {digest} is not hex encoded"
        )));
    }
    Ok(root.join(BLOBS_DIR).join(algorithm).join(encoded))
}

/// One image stored in an [`ImageLayout`].
pub struct LayoutImage {
    root: PathBuf,
    digest: Digest,
    size: u64,
    manifest: OnceLock<ImageManifest>,
}

impl LayoutImage {
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Read the manifest blob, rejecting it unless its size and content
    /// match the descriptor it was found through.
    fn read_manifest(&self) -> Result<ImageManifest> {
        let file = File::open(blob_path(&self.root, &self.digest)?)?;
        let on_disk = file.metadata()?.len();
        if on_disk != self.size {
            return Err(ArtifactError::BlobSizeMismatch {
                digest: self.digest.to_string(),
                declared: self.size,
                actual: on_disk,
            });
        }

        // The file may still grow after the metadata check.
        let mut content = Vec::with_capacity(self.size as usize);
        file.take(self.size + 1).read_to_end(&mut content)?;
        if content.len() as u64 != self.size {
            return Err(ArtifactError::BlobSizeMismatch {
                digest: self.digest.to_string(),
                declared: self.size,
                actual: content.len() as u64,
            });
        }

        let hasher = LayerDigestHasher::for_digest(&self.digest)?;
        let actual = digest_reader(hasher, &mut content.as_slice())?;
        if actual != self.digest.to_string() {
            return Err(ArtifactError::DigestMismatch {
                digest: self.digest.to_string(),
                actual,
            });
        }

        serde_json::from_slice(&content).map_err(|source| ArtifactError::JsonDecodeFailed {
            source,
            context: "image manifest",
        })
    }

    fn cached_manifest(&self) -> Result<&ImageManifest> {
        if let Some(manifest) = self.manifest.get() {
            return Ok(manifest);
        }
        let manifest = self.read_manifest()?;
        Ok(self.manifest.get_or_init(|| manifest))
    }
}

impl ImageSource for LayoutImage {
    fn manifest(&self) -> anyhow::Result<ImageManifest> {
        Ok(self.cached_manifest()?.clone())
    }

    fn layer_by_digest(&self, digest: &Digest) -> anyhow::Result<Box<dyn Layer>> {
        let desc = self
            .cached_manifest()?
            .layers()
            .iter()
            .find(|desc| desc.digest() == digest)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("layer {digest} is not part of image {}", self.digest))?;

        let path = blob_path(&self.root, digest)?;
        if !path.is_file() {
            anyhow::bail!("blob {digest} not found in layout {}", self.root.display());
        }

        Ok(Box::new(LayoutLayer { path, desc }))
    }
}

/// A layer blob on disk, described by its manifest descriptor.
pub struct LayoutLayer {
    path: PathBuf,
    desc: Descriptor,
}

impl LayoutLayer {
    fn compression(&self) -> Result<Compression> {
        Compression::try_from(self.desc.media_type().to_string().as_str())
    }

    fn open(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

impl Layer for LayoutLayer {
    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(self.desc.digest().clone())
    }

    fn diff_id(&self) -> anyhow::Result<Digest> {
        if self.compression()? == Compression::Uncompressed {
            return Ok(self.desc.digest().clone());
        }
        let hasher = LayerDigestHasher::Sha256(Default::default());
        let diff_id = digest_reader(hasher, &mut self.uncompressed()?)?;
        Ok(parse_digest(&diff_id)?)
    }

    fn compressed(&self) -> anyhow::Result<Box<dyn Read + Send + '_>> {
        Ok(self.open()?)
    }

    fn uncompressed(&self) -> anyhow::Result<Box<dyn Read + Send + '_>> {
        let compression = self.compression()?;
        Ok(compression.decompress(self.open()?)?)
    }

    fn size(&self) -> anyhow::Result<u64> {
        Ok(self.desc.size())
    }

    fn media_type(&self) -> anyhow::Result<MediaType> {
        Ok(self.desc.media_type().clone())
    }
}
