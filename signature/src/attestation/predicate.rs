// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

pub const COSIGN_CUSTOM_PROVENANCE_V01: &str = "https://cosign.sigstore.dev/attestation/v1";
pub const COSIGN_VULN_PROVENANCE_V01: &str = "https://cosign.sigstore.dev/attestation/vuln/v1";
pub const SLSA_PROVENANCE_V02: &str = "https://slsa.dev/provenance/v0.2";
pub const SLSA_PROVENANCE_V1: &str = "https://slsa.dev/provenance/v1";
pub const SPDX_DOCUMENT: &str = "https://spdx.dev/Document";
pub const CYCLONEDX_BOM: &str = "https://cyclonedx.org/bom";
pub const INTOTO_LINK_V1: &str = "https://in-toto.io/Link/v1";
pub const OPENVEX: &str = "https://openvex.dev/ns";

/// Short names accepted in place of a predicate type URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PredicateKind {
    Custom,
    SlsaProvenance,
    SlsaProvenance02,
    SlsaProvenance1,
    Spdx,
    SpdxJson,
    CycloneDx,
    Link,
    Vuln,
    OpenVex,
}

impl PredicateKind {
    pub fn uri(&self) -> &'static str {
        match self {
            PredicateKind::Custom => COSIGN_CUSTOM_PROVENANCE_V01,
            PredicateKind::SlsaProvenance | PredicateKind::SlsaProvenance02 => SLSA_PROVENANCE_V02,
            PredicateKind::SlsaProvenance1 => SLSA_PROVENANCE_V1,
            PredicateKind::Spdx | PredicateKind::SpdxJson => SPDX_DOCUMENT,
            PredicateKind::CycloneDx => CYCLONEDX_BOM,
            PredicateKind::Link => INTOTO_LINK_V1,
            PredicateKind::Vuln => COSIGN_VULN_PROVENANCE_V01,
            PredicateKind::OpenVex => OPENVEX,
        }
    }
}

/// Maps short predicate names to canonical predicate type URIs.
///
/// The registry is immutable once built. [`PredicateTypeRegistry::global`]
/// holds the built-in names; tests and embedders may build their own.
#[derive(Clone, Debug)]
pub struct PredicateTypeRegistry {
    types: HashMap<String, String>,
}

impl PredicateTypeRegistry {
    pub fn new<I, K, V>(types: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            types: types
                .into_iter()
                .map(|(name, uri)| (name.into(), uri.into()))
                .collect(),
        }
    }

    pub fn global() -> &'static Self {
        static REGISTRY: OnceLock<PredicateTypeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::default)
    }

    /// The canonical URI for `name`. Names the registry does not know are
    /// returned unchanged and treated as opaque custom types.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.types.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_canonical(&self, uri: &str) -> bool {
        self.types.values().any(|known| known == uri)
    }
}

impl Default for PredicateTypeRegistry {
    fn default() -> Self {
        Self::new(PredicateKind::iter().map(|kind| (kind.to_string(), kind.uri())))
    }
}

/// Predicate of a `custom` attestation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CosignPredicate {
    #[serde(rename = "Data")]
    pub data: Value,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

/// Predicate of a `vuln` attestation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CosignVulnPredicate {
    pub invocation: Invocation,
    pub scanner: Scanner,
    pub metadata: ScanMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Invocation {
    pub parameters: Value,
    pub uri: String,
    pub event_id: String,
    #[serde(rename = "builder.id")]
    pub builder_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Scanner {
    pub uri: String,
    pub version: String,
    pub db: ScannerDb,
    pub result: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScannerDb {
    pub uri: String,
    pub version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetadata {
    pub scan_started_on: DateTime<Utc>,
    pub scan_finished_on: DateTime<Utc>,
}
