use crate::collection::DocumentId;
use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt::{Debug, Display};

/// A single structured record stored and retrieved as a unit.
///
/// A document maps field names to [Value]s and remembers insertion order, so
/// a document built for an insert reaches the store with its fields in the
/// order they were put. Equality ignores field order: two documents are equal
/// when they hold the same fields with equal values.
///
/// Embedded fields are addressed with `.`: for `{"a": {"b": 1}}`,
/// `document.get("a.b")` returns `1`. Array elements are addressed by index
/// (`"tags.0"`).
///
/// The `_id` field is reserved for the store-assigned [DocumentId] and only
/// accepts [Value::Id].
#[derive(Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of top level fields.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Associates the specified [Value] with the key in this document.
    ///
    /// A key containing `.` is treated as an embedded path and intermediate
    /// documents are created as needed.
    ///
    /// # Errors
    ///
    /// * The key is empty.
    /// * The key is `_id` and the value is not a [Value::Id].
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("name", "Alice")?;
    /// doc.put("address.city", "Paris")?;
    /// assert_eq!(doc.get("address.city"), Some(&Value::from("Paris")));
    /// ```
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> GatewayResult<()> {
        let value = value.into();
        Self::validate(key, &value)?;

        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value)
        } else {
            self.data.insert(key.to_string(), value);
            Ok(())
        }
    }

    /// Sets a top level field verbatim, without splitting the key on `.`.
    ///
    /// Store adapters use this when decoding records whose field names may
    /// legitimately contain dots.
    pub fn put_field<T: Into<Value>>(&mut self, key: &str, value: T) -> GatewayResult<()> {
        let value = value.into();
        Self::validate(key, &value)?;
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    /// Sets a top level field without any validation. Filters use this for
    /// predicate keys such as `$or` or `_id` operator documents.
    #[doc(hidden)]
    pub fn put_verbatim(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    /// Returns the value for the key, following embedded paths, or `None`
    /// when there is no such field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.data.get(key) {
            Some(value) => Some(value),
            None if key.contains(FIELD_SEPARATOR) => self.deep_get(key),
            None => None,
        }
    }

    /// The document identifier, if one has been assigned.
    pub fn id(&self) -> Option<&DocumentId> {
        self.data.get(DOC_ID).and_then(|v| v.as_id())
    }

    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    /// Assigns the identifier, placing `_id` first as stores do.
    pub fn set_id(&mut self, id: DocumentId) {
        self.data.shift_insert(0, DOC_ID.to_string(), Value::Id(id));
    }

    /// Removes a top level field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Top level field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.data.iter()
    }

    fn validate(key: &str, value: &Value) -> GatewayResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(GatewayError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        if key == DOC_ID && !value.is_id() {
            log::error!("Document id must be a DocumentId, found {}", value.type_name());
            return Err(GatewayError::new(
                &format!(
                    "Document id must be a DocumentId, found {}",
                    value.type_name()
                ),
                ErrorKind::InvalidId,
            ));
        }
        Ok(())
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> GatewayResult<()> {
        let (first, rest) = match splits.split_first() {
            Some(parts) => parts,
            None => return Ok(()),
        };

        if first.is_empty() {
            log::error!("Document does not support empty embedded key");
            return Err(GatewayError::new(
                "Document does not support empty embedded key",
                ErrorKind::InvalidOperation,
            ));
        }

        if rest.is_empty() {
            self.data.insert(first.to_string(), value);
            return Ok(());
        }

        let entry = self
            .data
            .entry(first.to_string())
            .or_insert_with(|| Value::Document(Document::new()));
        if !entry.is_document() {
            *entry = Value::Document(Document::new());
        }
        match entry.as_document_mut() {
            Some(nested) => nested.deep_put(rest, value),
            None => Err(GatewayError::new(
                "embedded field is not a document",
                ErrorKind::InternalError,
            )),
        }
    }

    fn deep_get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split(FIELD_SEPARATOR);
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Document(doc) => doc.data.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.data
                .iter()
                .map(|(k, v)| format!("{:?}: {}", k, v))
                .join(", ")
        )
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// # Examples
///
/// ```rust
/// use docgate::doc;
///
/// let empty = doc!{};
///
/// let simple = doc!{
///     name: "Alice",
///     age: 30
/// };
///
/// let query = doc!{
///     age: { "$gte": 18 },
///     tags: ["admin", "user"]
/// };
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::collection::Document::new()
    };

    () => {
        $crate::collection::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.put(&$crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro converting values for [doc!].
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
