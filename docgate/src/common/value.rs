use crate::collection::{Document, DocumentId};
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};

/// Compare two floats for equality with NaN equal to itself.
#[inline]
fn num_eq_float(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        true
    } else {
        a == b
    }
}

/// Represents a [Document] field value.
///
/// Values are a closed set of variants so every store adapter maps the same
/// document model: scalars, nested documents, arrays and store-assigned
/// identifiers.
///
/// Numeric variants compare equal across widths, so `I32(1)`, `I64(1)` and
/// `F64(1.0)` are all equal. This keeps filters written with Rust literals
/// matching documents decoded from a store that widened the number.
///
/// ```text
/// let v1: Value = 42.into();
/// let v2 = Value::from("hello");
/// let v3 = val!(true);
/// ```
#[derive(Clone, Default, serde::Deserialize, serde::Serialize)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    String(String),
    /// A nested document.
    Document(Document),
    /// An ordered list of values.
    Array(Vec<Value>),
    /// A store-assigned document identifier.
    Id(DocumentId),
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::I32(n) => write!(f, "I32({})", n),
            Value::I64(n) => write!(f, "I64({})", n),
            Value::F64(n) => write!(f, "F64({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Document(doc) => write!(f, "Document({:?})", doc),
            Value::Array(items) => write!(f, "Array({:?})", items),
            Value::Id(id) => write!(f, "Id({})", id),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(n) => write!(f, "{}", n),
            Value::I64(n) => write!(f, "{}", n),
            Value::F64(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Document(doc) => write!(f, "{}", doc),
            Value::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Id(id) => write!(f, "ObjectId({:?})", id.to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.is_number() && other.is_number() {
            if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
                return a == b;
            }
            if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                return num_eq_float(a, b);
            }
        }

        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Id(a), Value::Id(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Creates a `Value` from anything convertible into one.
    pub fn from<T: Into<Value>>(value: T) -> Value {
        value.into()
    }

    pub fn as_bool(&self) -> Option<&bool> {
        match self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as an `i64` if it is an integer variant.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::I32(n) => Some(*n as i64),
            Value::I64(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns any numeric variant widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I32(n) => Some(*n as f64),
            Value::I64(n) => Some(*n as f64),
            Value::F64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&DocumentId> {
        match self {
            Value::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::I32(_) | Value::I64(_) | Value::F64(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Value::Id(_))
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::F64(_) => "double",
            Value::String(_) => "string",
            Value::Document(_) => "document",
            Value::Array(_) => "array",
            Value::Id(_) => "objectId",
        }
    }

    /// Replaces this value with `Null`, returning the previous value.
    pub fn take(&mut self) -> Value {
        std::mem::take(self)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F64(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl From<DocumentId> for Value {
    fn from(value: DocumentId) -> Self {
        Value::Id(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

/// A macro to create a `Value` from a given expression.
///
/// # Examples
///
/// ```rust
/// use docgate::common::Value;
/// use docgate::val;
///
/// assert_eq!(val!(42), Value::I32(42));
/// assert_eq!(val!("hello"), Value::String("hello".to_string()));
/// assert_eq!(val!(true), Value::Bool(true));
/// ```
#[macro_export]
macro_rules! val {
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn numbers_compare_across_widths() {
        assert_eq!(Value::I32(1), Value::I64(1));
        assert_eq!(Value::I64(1), Value::F64(1.0));
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
        assert_ne!(Value::I32(1), Value::F64(1.5));
        assert_ne!(Value::I32(1), Value::String("1".to_string()));
    }

    #[test]
    fn null_only_equals_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Bool(false));
        assert!(Value::default().is_null());
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from("a"), Value::String("a".to_string()));
        assert_eq!(Value::from(Some(3)), Value::I32(3));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::Array(vec![Value::I32(1), Value::I32(2)])
        );
        assert!(Value::from(doc! { a: 1 }).is_document());
        let id = DocumentId::new();
        assert_eq!(Value::from(id.clone()).as_id(), Some(&id));
    }

    #[test]
    fn accessors_match_variant() {
        let value = Value::I64(7);
        assert_eq!(value.as_integer(), Some(7));
        assert_eq!(value.as_f64(), Some(7.0));
        assert!(value.as_string().is_none());
        assert_eq!(value.type_name(), "int64");
        assert_eq!(Value::F64(1.5).as_integer(), None);
    }

    #[test]
    fn display_is_json_like() {
        let value = Value::Array(vec![Value::from("x"), Value::I32(2), Value::Null]);
        assert_eq!(value.to_string(), "[\"x\", 2, null]");
    }

    #[test]
    fn take_leaves_null() {
        let mut value = Value::from("x");
        let taken = value.take();
        assert_eq!(taken, Value::from("x"));
        assert!(value.is_null());
    }
}
