//! Introspectable validation rules.
//!
//! A [`RuleSet`] maps field names to rule expressions such as
//! `"required,url"` or `"required,in(GET|POST)"`. Executors expose one for
//! their input and one for their output so that an orchestrator or UI can
//! present the expected shape without running the executor.

use std::collections::BTreeMap;

use serde::Serialize;

/// Field name to rule expression. An empty expression means "no rule".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuleSet(BTreeMap<String, String>);

impl RuleSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a field rule, replacing any previous rule for the same field.
  pub fn field(mut self, name: impl Into<String>, rule: impl Into<String>) -> Self {
    self.0.insert(name.into(), rule.into());
    self
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.get(name).map(String::as_str)
  }

  /// Whether the field's rule includes `required`.
  pub fn is_required(&self, name: &str) -> bool {
    self
      .get(name)
      .is_some_and(|rule| rule.split(',').any(|part| part.trim() == "required"))
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// A type that declares the rules its fields are validated against.
pub trait Schema {
  fn rules() -> RuleSet;
}
