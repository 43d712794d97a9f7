// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Read;
use std::str::FromStr;

use oci_spec::image::Digest as OciDigest;
use sha2::Digest;

use crate::error::{ArtifactError, Result};

pub const DIGEST_SHA256_PREFIX: &str = "sha256:";
pub const DIGEST_SHA512_PREFIX: &str = "sha512:";

pub trait DigestHasher {
    fn digest_update(&mut self, buf: &[u8]);
    fn digest_finalize(self) -> String;
}

#[derive(Clone, Debug)]
pub enum LayerDigestHasher {
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl LayerDigestHasher {
    /// Pick the hasher matching the algorithm of an existing content digest.
    pub fn for_digest(digest: &OciDigest) -> Result<Self> {
        let digest = digest.to_string();
        if digest.starts_with(DIGEST_SHA256_PREFIX) {
            Ok(LayerDigestHasher::Sha256(sha2::Sha256::new()))
        } else if digest.starts_with(DIGEST_SHA512_PREFIX) {
            Ok(LayerDigestHasher::Sha512(sha2::Sha512::new()))
        } else {
            Err(ArtifactError::UnsupportedDigestAlgorithm(digest))
        }
    }
}

impl DigestHasher for LayerDigestHasher {
    fn digest_update(&mut self, buf: &[u8]) {
        match self {
            LayerDigestHasher::Sha256(hasher) => {
                hasher.update(buf);
            }
            LayerDigestHasher::Sha512(hasher) => {
                hasher.update(buf);
            }
        }
    }

    fn digest_finalize(self) -> String {
        match self {
            LayerDigestHasher::Sha256(hasher) => {
                format!("{}{:x}", DIGEST_SHA256_PREFIX, hasher.finalize())
            }
            LayerDigestHasher::Sha512(hasher) => {
                format!("{}{:x}", DIGEST_SHA512_PREFIX, hasher.finalize())
            }
        }
    }
}

/// `sha256:<hex>` of the given bytes.
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = LayerDigestHasher::Sha256(sha2::Sha256::new());
    hasher.digest_update(data);
    hasher.digest_finalize()
}

/// Drain `reader` through `hasher` and return the finalized digest string.
pub fn digest_reader(mut hasher: LayerDigestHasher, reader: &mut dyn Read) -> Result<String> {
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.digest_update(&buf[..n]);
    }
    Ok(hasher.digest_finalize())
}

pub fn parse_digest(digest: &str) -> Result<OciDigest> {
    Ok(OciDigest::from_str(digest)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        b"".as_slice(),
        "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    )]
    #[case(
        b"hello world".as_slice(),
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    )]
    fn test_sha256_digest(#[case] data: &[u8], #[case] expected: &str) {
        assert_eq!(sha256_digest(data), expected);
        assert_eq!(parse_digest(expected).unwrap().to_string(), expected);
    }

    #[test]
    fn test_digest_reader_matches_one_shot() {
        let data = vec![7u8; 20000];
        let digest = parse_digest(&sha256_digest(&data)).unwrap();
        let hasher = LayerDigestHasher::for_digest(&digest).unwrap();
        let streamed = digest_reader(hasher, &mut data.as_slice()).unwrap();
        assert_eq!(streamed, digest.to_string());
    }

    #[test]
    fn test_hasher_for_sha512() {
        let digest = parse_digest(&format!("{}{}", DIGEST_SHA512_PREFIX, "a".repeat(128))).unwrap();
        let hasher = LayerDigestHasher::for_digest(&digest).unwrap();
        assert!(matches!(hasher, LayerDigestHasher::Sha512(_)));
    }
}
