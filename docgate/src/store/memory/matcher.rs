use crate::collection::Document;
use crate::common::{Collation, Value, OPERATOR_PREFIX};
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use icu_collator::CollatorBorrowed;
use regex::RegexBuilder;
use std::cmp::Ordering;

/// Evaluates filter documents against stored documents.
///
/// Supports field equality (including matching an element of an array
/// field), the comparison operators `$eq $ne $gt $gte $lt $lte $in $nin`,
/// `$exists`, `$regex` with `$options: "i"`, and the logical `$and $or $nor`.
/// When built with a collation, string equality and ordering go through an
/// ICU collator.
pub(crate) struct Matcher {
    collator: Option<CollatorBorrowed<'static>>,
}

impl Matcher {
    pub(crate) fn new(collation: Option<&Collation>) -> GatewayResult<Self> {
        let collator = match collation {
            Some(collation) => Some(collation.collator()?),
            None => None,
        };
        Ok(Matcher { collator })
    }

    pub(crate) fn matches(&self, document: &Document, filter: &Document) -> GatewayResult<bool> {
        for (key, condition) in filter.iter() {
            if !self.matches_entry(document, key, condition)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches_entry(&self, document: &Document, key: &str, condition: &Value) -> GatewayResult<bool> {
        match key {
            "$and" => {
                for operand in logical_operands(key, condition)? {
                    if !self.matches(document, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            "$or" => {
                for operand in logical_operands(key, condition)? {
                    if self.matches(document, operand)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            "$nor" => {
                for operand in logical_operands(key, condition)? {
                    if self.matches(document, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ if key.starts_with(OPERATOR_PREFIX) => Err(filter_error(&format!(
                "unknown top level operator {}",
                key
            ))),
            _ => self.matches_condition(document.get(key), condition),
        }
    }

    fn matches_condition(&self, field: Option<&Value>, condition: &Value) -> GatewayResult<bool> {
        if let Value::Document(operators) = condition {
            if is_operator_document(operators) {
                for (operator, operand) in operators.iter() {
                    if !self.apply_operator(field, operator, operand, operators)? {
                        return Ok(false);
                    }
                }
                return Ok(true);
            }
        }
        Ok(self.equals_field(field, condition))
    }

    fn apply_operator(
        &self,
        field: Option<&Value>,
        operator: &str,
        operand: &Value,
        operators: &Document,
    ) -> GatewayResult<bool> {
        match operator {
            "$eq" => Ok(self.equals_field(field, operand)),
            "$ne" => Ok(!self.equals_field(field, operand)),
            "$gt" => Ok(self.compare_field(field, operand, |o| o == Ordering::Greater)),
            "$gte" => Ok(self.compare_field(field, operand, |o| o != Ordering::Less)),
            "$lt" => Ok(self.compare_field(field, operand, |o| o == Ordering::Less)),
            "$lte" => Ok(self.compare_field(field, operand, |o| o != Ordering::Greater)),
            "$in" => {
                let candidates = array_operand(operator, operand)?;
                Ok(candidates.iter().any(|c| self.equals_field(field, c)))
            }
            "$nin" => {
                let candidates = array_operand(operator, operand)?;
                Ok(!candidates.iter().any(|c| self.equals_field(field, c)))
            }
            "$exists" => match operand.as_bool() {
                Some(expected) => Ok(field.is_some() == *expected),
                None => Err(filter_error("$exists expects a boolean")),
            },
            "$regex" => self.matches_regex(field, operand, operators.get("$options")),
            // consumed by $regex
            "$options" => Ok(true),
            _ => Err(filter_error(&format!("unknown operator {}", operator))),
        }
    }

    fn matches_regex(
        &self,
        field: Option<&Value>,
        pattern: &Value,
        options: Option<&Value>,
    ) -> GatewayResult<bool> {
        let pattern = pattern
            .as_string()
            .ok_or_else(|| filter_error("$regex expects a string pattern"))?;
        let case_insensitive = options
            .and_then(|o| o.as_string())
            .map(|o| o.contains('i'))
            .unwrap_or(false);

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|err| filter_error(&format!("invalid $regex pattern: {}", err)))?;

        Ok(match field {
            Some(Value::String(text)) => regex.is_match(text),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_string())
                .any(|text| regex.is_match(text)),
            _ => false,
        })
    }

    fn equals_field(&self, field: Option<&Value>, expected: &Value) -> bool {
        match field {
            None => expected.is_null(),
            Some(Value::Array(items)) if !expected.is_array() => {
                items.iter().any(|item| self.values_equal(item, expected))
            }
            Some(value) => self.values_equal(value, expected),
        }
    }

    fn values_equal(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::String(a), Value::String(b)) => match &self.collator {
                Some(collator) => collator.compare(a, b) == Ordering::Equal,
                None => a == b,
            },
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| self.values_equal(x, y))
            }
            (Value::Document(a), Value::Document(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| match b.get(key) {
                        Some(other) => self.values_equal(value, other),
                        None => false,
                    })
            }
            _ => left == right,
        }
    }

    fn compare_field<F>(&self, field: Option<&Value>, operand: &Value, accept: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        match field {
            None => false,
            Some(Value::Array(items)) if !operand.is_array() => items
                .iter()
                .any(|item| self.compare_values(item, operand).map(&accept).unwrap_or(false)),
            Some(value) => self.compare_values(value, operand).map(accept).unwrap_or(false),
        }
    }

    /// Orders two values of the same family; mixed families do not compare.
    fn compare_values(&self, left: &Value, right: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (left.as_integer(), right.as_integer()) {
            return Some(a.cmp(&b));
        }
        if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
            return a.partial_cmp(&b);
        }

        match (left, right) {
            (Value::String(a), Value::String(b)) => Some(match &self.collator {
                Some(collator) => collator.compare(a, b),
                None => a.cmp(b),
            }),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Id(a), Value::Id(b)) => match (a.bytes(), b.bytes()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => match (a.as_i64(), b.as_i64()) {
                    (Some(x), Some(y)) => Some(x.cmp(&y)),
                    _ => match (a.as_text(), b.as_text()) {
                        (Some(x), Some(y)) => Some(x.cmp(y)),
                        _ => None,
                    },
                },
            },
            _ => None,
        }
    }
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty() && document.fields().all(|f| f.starts_with(OPERATOR_PREFIX))
}

fn logical_operands<'a>(operator: &str, condition: &'a Value) -> GatewayResult<Vec<&'a Document>> {
    let items = condition
        .as_array()
        .ok_or_else(|| filter_error(&format!("{} expects an array of filters", operator)))?;
    if items.is_empty() {
        return Err(filter_error(&format!("{} expects a non-empty array", operator)));
    }

    items
        .iter()
        .map(|item| {
            item.as_document()
                .ok_or_else(|| filter_error(&format!("{} operands must be documents", operator)))
        })
        .collect()
}

fn array_operand<'a>(operator: &str, operand: &'a Value) -> GatewayResult<&'a Vec<Value>> {
    operand
        .as_array()
        .ok_or_else(|| filter_error(&format!("{} expects an array", operator)))
}

fn filter_error(message: &str) -> GatewayError {
    log::error!("Invalid filter: {}", message);
    GatewayError::new(message, ErrorKind::FilterError)
}
