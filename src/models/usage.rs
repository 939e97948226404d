use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// The kinds of quantity a provider may bill or report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UsageKind {
    InputTokens,
    OutputTokens,
    CachedTokens,
    ReasoningTokens,
    TotalTokens,
    Characters,
    Seconds,
    Images,
}

/// A sparse mapping from usage kind to quantity.
///
/// Unknown or zero quantities are omitted rather than zero-filled, so that
/// summing usages across calls stays additive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage(BTreeMap<UsageKind, f64>);

impl Usage {
    pub fn new() -> Self {
        Usage::default()
    }

    /// Record a quantity. Zero and negative values are dropped.
    pub fn with(mut self, kind: UsageKind, quantity: f64) -> Self {
        self.record(kind, quantity);
        self
    }

    pub fn record(&mut self, kind: UsageKind, quantity: f64) {
        if quantity > 0.0 {
            *self.0.entry(kind).or_insert(0.0) += quantity;
        }
    }

    pub fn get(&self, kind: UsageKind) -> Option<f64> {
        self.0.get(&kind).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add another usage into this one, entry by entry.
    pub fn merge(&mut self, other: &Usage) {
        for (kind, quantity) in &other.0 {
            self.record(*kind, *quantity);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (UsageKind, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_entries_omitted() {
        let usage = Usage::new()
            .with(UsageKind::InputTokens, 12.0)
            .with(UsageKind::OutputTokens, 0.0);
        assert_eq!(usage.get(UsageKind::InputTokens), Some(12.0));
        assert_eq!(usage.get(UsageKind::OutputTokens), None);
    }

    #[test]
    fn test_merge_is_additive() {
        let mut total = Usage::new().with(UsageKind::InputTokens, 10.0);
        total.merge(&Usage::new().with(UsageKind::InputTokens, 5.0).with(UsageKind::Images, 1.0));
        assert_eq!(total.get(UsageKind::InputTokens), Some(15.0));
        assert_eq!(total.get(UsageKind::Images), Some(1.0));
    }

    #[test]
    fn test_empty_usage_serializes_empty() {
        let json = serde_json::to_value(Usage::new()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(UsageKind::InputTokens.to_string(), "input_tokens");
        assert_eq!(
            "cached_tokens".parse::<UsageKind>().unwrap(),
            UsageKind::CachedTokens
        );
    }
}
