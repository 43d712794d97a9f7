// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use strum::Display;

use crate::error::{ArtifactError, Result};

const ENCRYPTED_SUFFIX: &str = "+encrypted";

/// Compression of a layer blob, derived from its media type.
#[derive(Display, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    #[default]
    #[strum(serialize = "uncompressed")]
    Uncompressed,
    #[strum(serialize = "gzip")]
    Gzip,
    #[strum(serialize = "zstd")]
    Zstd,
}

impl TryFrom<&str> for Compression {
    type Error = ArtifactError;

    /// Signature and attestation layers are plain JSON, so anything that
    /// does not announce a compression is read as is. Encrypted layers cannot
    /// be decoded without their keys.
    fn try_from(media_type: &str) -> Result<Self> {
        if media_type.ends_with(ENCRYPTED_SUFFIX) {
            return Err(ArtifactError::Unavailable {
                representation: "uncompressed content",
                media_type: media_type.to_string(),
            });
        }

        if media_type.ends_with("gzip") {
            Ok(Compression::Gzip)
        } else if media_type.ends_with("zstd") {
            Ok(Compression::Zstd)
        } else {
            Ok(Compression::Uncompressed)
        }
    }
}

impl Compression {
    pub fn decompress<'a>(
        &self,
        input: Box<dyn Read + Send + 'a>,
    ) -> Result<Box<dyn Read + Send + 'a>> {
        match self {
            Compression::Uncompressed => Ok(input),
            Compression::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(input))),
            Compression::Zstd => Ok(Box::new(zstd::stream::read::Decoder::new(input)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case("application/vnd.oci.image.layer.v1.tar", Compression::Uncompressed)]
    #[case("application/vnd.oci.image.layer.v1.tar+gzip", Compression::Gzip)]
    #[case("application/vnd.docker.image.rootfs.diff.tar.gzip", Compression::Gzip)]
    #[case("application/vnd.oci.image.layer.v1.tar+zstd", Compression::Zstd)]
    #[case("application/vnd.dev.cosign.simplesigning.v1+json", Compression::Uncompressed)]
    #[case("application/vnd.dsse.envelope.v1+json", Compression::Uncompressed)]
    fn test_from_media_type(#[case] media_type: &str, #[case] expected: Compression) {
        assert_eq!(Compression::try_from(media_type).unwrap(), expected);
    }

    #[test]
    fn test_encrypted_is_unavailable() {
        let err = Compression::try_from("application/vnd.oci.image.layer.v1.tar+gzip+encrypted")
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Unavailable { .. }));
    }

    #[test]
    fn test_decompress() {
        let data = b"This is some text!".to_vec();

        let mut gzip_encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        gzip_encoder.write_all(&data).unwrap();
        let gzip_compressed_bytes = gzip_encoder.finish().unwrap();
        let zstd_compressed_bytes = zstd::encode_all(data.as_slice(), 0).unwrap();

        for (compression, input) in [
            (Compression::Uncompressed, data.clone()),
            (Compression::Gzip, gzip_compressed_bytes),
            (Compression::Zstd, zstd_compressed_bytes),
        ] {
            let mut out = Vec::new();
            compression
                .decompress(Box::new(std::io::Cursor::new(input)))
                .unwrap()
                .read_to_end(&mut out)
                .unwrap();
            assert_eq!(out, data, "compression {compression}");
        }
    }
}
