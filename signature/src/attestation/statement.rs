// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATEMENT_TYPE_V01: &str = "https://in-toto.io/Statement/v0.1";

/// An in-toto statement. `P` is the predicate body, left as raw JSON unless
/// the caller knows its shape.
///
/// Every field may be absent; only `predicateType` matters when resolving
/// an attestation. A missing predicate is `None` and serializes as `null`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Statement<P = Value> {
    #[serde(rename = "_type", default)]
    pub statement_type: String,

    #[serde(rename = "predicateType", default)]
    pub predicate_type: String,

    #[serde(default)]
    pub subject: Vec<Subject>,

    pub predicate: Option<P>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    #[serde(default)]
    pub name: String,
    /// Algorithm name to hex digest.
    #[serde(default)]
    pub digest: BTreeMap<String, String>,
}
