//! Docker schema1 manifests, unsigned and JWS-signed.
//!
//! A signed manifest embeds its signatures inside the JSON document. The
//! signed payload is recovered from the protected header of each signature:
//! the first `formatLength` bytes of the document followed by the decoded
//! `formatTail`.

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use keel_types::Digest;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::schema2::RuntimeConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema1Manifest {
    pub schema_version: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub architecture: String,
    /// Layers, top layer first.
    #[serde(default)]
    pub fs_layers: Vec<FsLayer>,
    /// One entry per layer, same order as `fs_layers`.
    #[serde(default)]
    pub history: Vec<History>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<Signature>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsLayer {
    #[serde(rename = "blobSum")]
    pub blob_sum: Digest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    #[serde(rename = "v1Compatibility")]
    pub v1_compatibility: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub header: serde_json::Value,
    pub signature: String,
    pub protected: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtectedHeader {
    format_length: usize,
    format_tail: String,
}

/// The v1 image JSON carried in `history[0]`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct V1Compatibility {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub config: Option<RuntimeConfig>,
}

impl Schema1Manifest {
    /// Returns `true` if the document carries at least one signature.
    pub fn is_signed(&self) -> bool {
        self.signatures.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Distinct layer digests, base layer first.
    pub fn layers(&self) -> Vec<Digest> {
        let mut seen = HashSet::new();
        self.fs_layers
            .iter()
            .rev()
            .map(|l| l.blob_sum)
            .filter(|d| seen.insert(*d))
            .collect()
    }

    /// Parse the v1 image JSON of the top layer.
    pub fn v1_compatibility(&self) -> CodecResult<V1Compatibility> {
        let top = self
            .history
            .first()
            .ok_or_else(|| CodecError::Config("schema1 manifest has no history".into()))?;
        Ok(serde_json::from_str(&top.v1_compatibility)?)
    }
}

/// Recover the signed payload of a JWS-signed schema1 document.
///
/// Every signature must describe the same payload.
pub fn signed_payload(raw: &[u8], signatures: &[Signature]) -> CodecResult<Vec<u8>> {
    let mut payload: Option<Vec<u8>> = None;
    for sig in signatures {
        let header: ProtectedHeader = serde_json::from_slice(&decode_segment(&sig.protected)?)
            .map_err(|e| CodecError::Signature(format!("protected header: {e}")))?;
        if header.format_length > raw.len() {
            return Err(CodecError::Signature(format!(
                "formatLength {} exceeds document length {}",
                header.format_length,
                raw.len()
            )));
        }
        let mut candidate = raw[..header.format_length].to_vec();
        candidate.extend(decode_segment(&header.format_tail)?);
        match &payload {
            Some(p) if *p != candidate => {
                return Err(CodecError::Signature("signatures disagree on payload".into()))
            }
            Some(_) => {}
            None => payload = Some(candidate),
        }
    }
    payload.ok_or_else(|| CodecError::Signature("no signatures".into()))
}

fn decode_segment(segment: &str) -> CodecResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| CodecError::Signature(format!("base64: {e}")))
}

/// Wrap `body` in a JWS envelope the way a schema1 signer does.
#[cfg(test)]
pub(crate) fn sign(body: &str) -> Vec<u8> {
    let cut = body.rfind("\n}").expect("body ends with a newline and brace");
    let (head, tail) = body.split_at(cut);
    let protected = URL_SAFE_NO_PAD.encode(
        serde_json::json!({
            "formatLength": head.len(),
            "formatTail": URL_SAFE_NO_PAD.encode(tail),
            "time": "2016-01-01T00:00:00Z",
        })
        .to_string(),
    );
    format!(
        "{head},\n   \"signatures\": [{{\"header\": {{\"alg\": \"ES256\"}}, \"signature\": \"c2ln\", \"protected\": \"{protected}\"}}]{tail}"
    )
    .into_bytes()
}
