//! Segmentation DSL.
//!
//! A segment is a JSON tree of `and`/`or`/`not` nodes with `custom_variable` and `user` leaves:
//!
//! ```json
//! {"and": [
//!   {"custom_variable": {"browser": "lower(chrome)"}},
//!   {"not": {"custom_variable": {"price": "lt(100)"}}}
//! ]}
//! ```
//!
//! Evaluation never fails. Anything malformed evaluates to `false` at the leaf and propagates
//! through the boolean operators as usual, so a mis-specified audience can only exclude users.
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{operand::Operand, variables::USER_ID_VARIABLE, Variables};

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum SegmentNode {
    And(Vec<SegmentNode>),
    Or(Vec<SegmentNode>),
    Not(Box<SegmentNode>),
    CustomVariable { key: String, operand: Operand },
    /// Comma-separated user ids, matched against `_vwo_user_id`.
    User(Vec<String>),
    /// Node that could not be understood. Always `false`.
    Invalid,
}

impl From<Value> for SegmentNode {
    fn from(value: Value) -> SegmentNode {
        SegmentNode::parse(&value)
    }
}

/// Deserialize an optional segment, treating `null` and `{}` as "no segment".
pub(crate) fn non_empty_segments<'de, D>(deserializer: D) -> Result<Option<SegmentNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::Object(ref map) if map.is_empty() => None,
        value => Some(SegmentNode::parse(&value)),
    })
}

/// Single-entry object as `(key, value)`.
fn single_entry(value: &Value) -> Option<(&str, &Value)> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.iter().next().map(|(key, value)| (key.as_str(), value))
}

/// Operand literals may be authored as JSON numbers or booleans.
fn operand_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl SegmentNode {
    pub fn parse(value: &Value) -> SegmentNode {
        Self::try_parse(value).unwrap_or_else(|| {
            log::debug!(target: "vwo", segment:serde = value; "invalid segment node");
            SegmentNode::Invalid
        })
    }

    fn try_parse(value: &Value) -> Option<SegmentNode> {
        let (operator, operands) = single_entry(value)?;
        let node = match operator {
            "and" => SegmentNode::And(operands.as_array()?.iter().map(Self::parse).collect()),
            "or" => SegmentNode::Or(operands.as_array()?.iter().map(Self::parse).collect()),
            "not" => {
                operands.as_object()?;
                SegmentNode::Not(Box::new(Self::parse(operands)))
            }
            "custom_variable" => {
                let (key, operand) = single_entry(operands)?;
                SegmentNode::CustomVariable {
                    key: key.to_owned(),
                    operand: Operand::parse(&operand_string(operand)?),
                }
            }
            "user" => SegmentNode::User(
                operand_string(operands)?
                    .split(',')
                    .map(|user| user.trim().to_owned())
                    .collect(),
            ),
            _ => return None,
        };
        Some(node)
    }

    /// Evaluate the segment against `variables`.
    pub fn eval(&self, variables: &Variables) -> bool {
        match self {
            SegmentNode::And(nodes) => nodes.iter().all(|node| node.eval(variables)),
            SegmentNode::Or(nodes) => nodes.iter().any(|node| node.eval(variables)),
            SegmentNode::Not(node) => !node.eval(variables),
            SegmentNode::CustomVariable { key, operand } => operand.eval(variables.get(key)),
            SegmentNode::User(users) => {
                let Some(user_id) = variables
                    .get(USER_ID_VARIABLE)
                    .and_then(|value| value.to_segment_string())
                else {
                    return false;
                };
                let user_id = user_id.trim();
                users.iter().any(|user| user == user_id)
            }
            SegmentNode::Invalid => false,
        }
    }
}

/// Parse and evaluate a segment in one go.
///
/// ```
/// # use vwo_core::{segments::evaluate, VariableValue, Variables};
/// let dsl = serde_json::json!({"or": [{"custom_variable": {"eq": "eq_value"}}]});
/// let variables = Variables::from([("eq".to_owned(), VariableValue::from("eq_value"))]);
/// assert!(evaluate(&dsl, &variables));
/// ```
pub fn evaluate(dsl: &Value, variables: &Variables) -> bool {
    SegmentNode::parse(dsl).eval(variables)
}
