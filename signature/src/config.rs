// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Hard cap on the number of layers of a signature image. A manifest listing
/// more layers is rejected before any layer is resolved.
pub const DEFAULT_MAX_LAYERS: usize = 1000;

/// Largest payload (128 MiB) a layer-backed artifact reads into memory.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 128 * 1024 * 1024;

/// Environment variable overriding [`SignatureConfig::max_payload_size`], in bytes.
pub const MAX_ATTACHMENT_SIZE_ENV: &str = "OCI_SIGNATURE_MAX_ATTACHMENT_SIZE";

/// Limits applied when reading signature images.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SignatureConfig {
    /// Maximum number of layers a signature image may have.
    ///
    /// This defaults to [`DEFAULT_MAX_LAYERS`].
    #[serde(default = "default_max_layers")]
    pub max_layers: usize,

    /// Maximum size in bytes of a single signature or attestation payload.
    ///
    /// This defaults to [`DEFAULT_MAX_PAYLOAD_SIZE`].
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: u64,
}

macro_rules! __default_deserialization_value {
    ($name: ident, $type: ident, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

__default_deserialization_value!(default_max_layers, usize, DEFAULT_MAX_LAYERS);
__default_deserialization_value!(default_max_payload_size, u64, DEFAULT_MAX_PAYLOAD_SIZE);

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            max_layers: DEFAULT_MAX_LAYERS,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl TryFrom<&Path> for SignatureConfig {
    /// Load `SignatureConfig` from a TOML file.
    type Error = anyhow::Error;
    fn try_from(config_path: &Path) -> Result<Self, Self::Error> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file {}", config_path.display()))?;
        toml::from_str(&content)
            .map_err(|e| anyhow!("failed to parse config file {}", e.to_string()))
    }
}

impl SignatureConfig {
    /// Apply [`MAX_ATTACHMENT_SIZE_ENV`] when it is set.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(value) = std::env::var(MAX_ATTACHMENT_SIZE_ENV) {
            self.max_payload_size = value
                .trim()
                .parse()
                .with_context(|| format!("invalid {MAX_ATTACHMENT_SIZE_ENV}: {value:?}"))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;
    use std::io::Write;

    #[rstest]
    #[case("", SignatureConfig::default())]
    #[case("max_layers = 10", SignatureConfig { max_layers: 10, ..Default::default() })]
    #[case(
        "max_layers = 3\nmax_payload_size = 4096",
        SignatureConfig { max_layers: 3, max_payload_size: 4096 }
    )]
    fn test_load_config(#[case] content: &str, #[case] expected: SignatureConfig) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let config = SignatureConfig::try_from(file.path()).unwrap();
        assert_eq!(config, expected);
    }

    #[test]
    fn test_load_config_errors() {
        assert!(SignatureConfig::try_from(Path::new("/does/not/exist.toml")).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"max_layers = \"many\"").unwrap();
        assert!(SignatureConfig::try_from(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var(MAX_ATTACHMENT_SIZE_ENV, "2048");
        let config = SignatureConfig::default().with_env_overrides().unwrap();
        assert_eq!(config.max_payload_size, 2048);
        assert_eq!(config.max_layers, DEFAULT_MAX_LAYERS);

        std::env::set_var(MAX_ATTACHMENT_SIZE_ENV, "lots");
        assert!(SignatureConfig::default().with_env_overrides().is_err());

        std::env::remove_var(MAX_ATTACHMENT_SIZE_ENV);
        let config = SignatureConfig::default().with_env_overrides().unwrap();
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);
    }
}
