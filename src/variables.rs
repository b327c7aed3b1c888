use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// Flat map of variables supplied by the host for one decision.
///
/// The same shape is used for audience "custom variables" and for whitelisting "variation
/// targeting variables".
///
/// # Examples
/// ```
/// # use vwo_core::{Variables, VariableValue};
/// let variables = Variables::from([
///     ("price".to_owned(), VariableValue::from(120.0)),
///     ("is_premium".to_owned(), VariableValue::from(true)),
///     ("browser".to_owned(), VariableValue::from("chrome")),
/// ]);
/// ```
pub type Variables = HashMap<String, VariableValue>;

/// Reserved variation-targeting key holding the user id for `user` segment leaves.
pub const USER_ID_VARIABLE: &str = "_vwo_user_id";

/// Value of a single variable.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum VariableValue {
    /// A string value.
    String(String),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// A null value or absence of value.
    Null,
}

impl VariableValue {
    /// Canonical string form used by segment operands. `None` for null.
    ///
    /// Booleans become `"true"`/`"false"`, integral numbers drop their fractional part.
    pub(crate) fn to_segment_string(&self) -> Option<String> {
        match self {
            VariableValue::String(s) => Some(s.clone()),
            VariableValue::Number(n) => Some(n.to_string()),
            VariableValue::Boolean(b) => Some(b.to_string()),
            VariableValue::Null => None,
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}
