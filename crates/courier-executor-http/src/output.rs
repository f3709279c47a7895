//! HTTP task output.

use std::collections::BTreeMap;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use courier_executor::{RuleSet, Schema};

/// Output of an HTTP task: the response headers and the raw body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpOutput {
  /// Lowercase header name to value. Repeated headers are joined with ", ".
  pub headers: BTreeMap<String, String>,

  /// Raw response body. Base64 in the serialized form.
  #[serde(with = "base64_body")]
  pub body: Vec<u8>,
}

impl Schema for HttpOutput {
  fn rules() -> RuleSet {
    RuleSet::new()
      .field("headers", "required,dictionary")
      .field("body", "")
  }
}

/// Collapse a response header map into one value per name.
pub fn normalize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
  let mut normalized: BTreeMap<String, String> = BTreeMap::new();

  for (name, value) in headers {
    let value = String::from_utf8_lossy(value.as_bytes());
    normalized
      .entry(name.as_str().to_string())
      .and_modify(|existing| {
        existing.push_str(", ");
        existing.push_str(&value);
      })
      .or_insert_with(|| value.to_string());
  }

  normalized
}

mod base64_body {
  use base64::Engine;
  use base64::engine::general_purpose::STANDARD;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&STANDARD.encode(bytes))
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
  }
}
