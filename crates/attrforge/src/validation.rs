//! Validation seam.
//!
//! The engine carries validation metadata ([`RulesCapability`]) but never
//! executes rules. A [`Validator`] attached to a data type is called with the
//! extracted data before every store write.

use crate::capability::RulesCapability;
use crate::error::Result;
use crate::value::RawMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The store operation being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => f.write_str("create"),
            Operation::Update => f.write_str("update"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

/// Checks extracted data against a data type's rules.
///
/// Implementations report failures as [`Error::Validation`](crate::error::Error::Validation).
pub trait Validator: Send + Sync {
    fn validate(
        &self,
        data_type: &str,
        operation: Operation,
        data: &RawMap,
        rules: &RulesCapability,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_display_lowercase() {
        assert_eq!(Operation::Create.to_string(), "create");
        assert_eq!(
            serde_json::to_value(Operation::Delete).unwrap(),
            serde_json::json!("delete")
        );
    }
}
