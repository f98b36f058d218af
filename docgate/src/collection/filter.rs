use crate::collection::{Document, DocumentId};
use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use std::fmt::{Display, Formatter};

/// A predicate document selecting the documents a read or delete applies to.
///
/// A filter is a conjunction of field constraints evaluated by the store, not
/// by docgate: `{name: "john"}` matches on equality, `{age: {"$gt": 30}}` uses
/// an operator. Gateways only ever borrow a filter, so the caller's value is
/// never modified.
///
/// Field names are kept verbatim, so `"address.city"` stays a path predicate.
/// Build filters with [filter!](crate::filter) or [Filter::and] rather than
/// [doc!](crate::doc), which expands dotted keys into nested documents.
///
/// A constraint that cannot be expressed (an empty field name, or `_id`
/// compared with something other than a [DocumentId]) is kept as a rejection.
/// Every gateway and store refuses a rejected filter with `FilterError`; it
/// never degrades to a match-all filter.
///
/// ```rust,ignore
/// use docgate::collection::Filter;
/// use docgate::filter;
///
/// let everything = Filter::all();
/// let parisians = filter! { "address.city": "Paris", age: { "$gte": 18 } };
/// let johns = Filter::eq("name", "john");
/// ```
#[derive(Clone, Default, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct Filter {
    document: Document,
    #[serde(skip)]
    rejected: Option<String>,
}

impl Filter {
    /// Wraps a predicate document as given.
    pub fn new(document: Document) -> Self {
        Filter {
            document,
            rejected: None,
        }
    }

    /// The empty filter, matching every document.
    pub fn all() -> Self {
        Filter::default()
    }

    /// Matches the document with the given identifier.
    pub fn by_id(id: &DocumentId) -> Self {
        Filter::all().and(DOC_ID, id.clone())
    }

    /// Matches documents whose `field` equals `value`.
    ///
    /// An invalid constraint is recorded and reported when the filter is
    /// used; see [Filter::try_eq] to get the error up front.
    pub fn eq<T: Into<Value>>(field: &str, value: T) -> Self {
        Filter::all().and(field, value)
    }

    /// Like [Filter::eq], failing with `FilterError` on an invalid constraint.
    pub fn try_eq<T: Into<Value>>(field: &str, value: T) -> GatewayResult<Self> {
        let filter = Filter::eq(field, value);
        filter.validate()?;
        Ok(filter)
    }

    /// Adds the constraint `field` matches `value`. The field name is not
    /// split on `.`.
    pub fn and<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        let value = value.into();
        if let Err(reason) = check_constraint(field, &value) {
            log::error!("Invalid filter constraint on {:?}: {}", field, reason);
            if self.rejected.is_none() {
                self.rejected = Some(reason);
            }
            return self;
        }
        self.document.put_verbatim(field, value);
        self
    }

    /// Fails with `FilterError` if any constraint was rejected.
    pub fn validate(&self) -> GatewayResult<()> {
        match &self.rejected {
            None => Ok(()),
            Some(reason) => Err(GatewayError::new(
                &format!("invalid filter: {}", reason),
                ErrorKind::FilterError,
            )),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.rejected.is_none()
    }

    pub fn as_document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Whether this filter matches every document.
    pub fn is_empty(&self) -> bool {
        self.rejected.is_none() && self.document.is_empty()
    }

    /// Whether this filter constrains the `_id` field.
    pub fn targets_id(&self) -> bool {
        self.document.contains_key(DOC_ID)
    }
}

fn check_constraint(field: &str, value: &Value) -> Result<(), String> {
    if field.is_empty() {
        return Err("field name cannot be empty".to_string());
    }
    // operator documents ({"$in": [...]}) are left to the store
    if field == DOC_ID && !value.is_id() && !value.is_document() {
        return Err(format!(
            "_id must be compared with a DocumentId, found {}",
            value.type_name()
        ));
    }
    Ok(())
}

impl From<Document> for Filter {
    fn from(document: Document) -> Self {
        Filter::new(document)
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.rejected {
            None => write!(f, "{}", self.document),
            Some(reason) => write!(f, "{} (invalid: {})", self.document, reason),
        }
    }
}

/// Creates a [Filter] with JSON-like syntax, keeping field names verbatim.
///
/// Unlike [doc!](crate::doc), dotted keys are not expanded, so they address
/// embedded fields the way the store expects.
///
/// ```rust
/// use docgate::filter;
///
/// let filter = filter! {
///     "address.city": "Paris",
///     age: { "$gte": 18 },
///     "$or": [{ role: "admin" }, { role: "owner" }],
/// };
/// assert!(filter.as_document().contains_key("address.city"));
/// ```
#[macro_export]
macro_rules! filter {
    () => {
        $crate::collection::Filter::all()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::filter!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let filter = $crate::collection::Filter::all();
            $(
                let filter = filter.and(
                    &$crate::collection::normalize(stringify!($key)),
                    $crate::predicate_value!($value),
                );
            )*
            filter
        }
    };
}

/// Helper macro converting values for [filter!]. Nested predicate documents
/// keep their keys verbatim too.
#[macro_export]
macro_rules! predicate_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            #[allow(unused_mut)]
            let mut document = $crate::collection::Document::new();
            $(
                document.put_verbatim(
                    &$crate::collection::normalize(stringify!($key)),
                    $crate::predicate_value!($value),
                );
            )*
            $crate::common::Value::Document(document)
        }
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::predicate_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{doc, filter};

    #[test]
    fn all_is_empty() {
        assert!(Filter::all().is_empty());
        assert_eq!(Filter::all().to_string(), "{}");
    }

    #[test]
    fn by_id_targets_id() {
        let id = DocumentId::new();
        let filter = Filter::by_id(&id);
        assert!(filter.targets_id());
        assert!(filter.is_valid());
        assert_eq!(filter.as_document().id(), Some(&id));
    }

    #[test]
    fn eq_builds_single_constraint() {
        let filter = Filter::eq("name", "john");
        assert_eq!(filter, Filter::new(doc! { name: "john" }));
    }

    #[test]
    fn eq_with_invalid_id_value_is_rejected() {
        let filter = Filter::eq(DOC_ID, "not-an-id");
        assert!(!filter.is_empty());
        assert!(!filter.is_valid());
        let err = filter.validate().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::FilterError);
        assert!(filter.to_string().contains("invalid"));
    }

    #[test]
    fn eq_with_empty_field_is_rejected() {
        let err = Filter::try_eq("", 1).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::FilterError);
    }

    #[test]
    fn first_rejection_survives_later_constraints() {
        let filter = Filter::eq("", 1).and("name", "john");
        assert!(!filter.is_valid());
        assert!(filter.as_document().contains_key("name"));
    }

    #[test]
    fn eq_keeps_dotted_field_verbatim() {
        let filter = Filter::eq("address.city", "Paris");
        assert!(filter.as_document().contains_key("address.city"));
        assert!(!filter.as_document().contains_key("address"));
    }

    #[test]
    fn macro_keeps_dotted_keys_verbatim() {
        let filter = filter! {
            "address.city": "Paris",
            "$or": [{ "address.zip": 75001 }, { age: { "$gte": 18 } }],
        };
        assert!(filter.is_valid());
        let document = filter.as_document();
        assert!(document.contains_key("address.city"));
        let branches = document.get("$or").and_then(|v| v.as_array()).unwrap();
        let first = branches[0].as_document().unwrap();
        assert!(first.contains_key("address.zip"));
    }

    #[test]
    fn macro_allows_id_operators() {
        let id = DocumentId::new();
        let filter = filter! { _id: { "$in": [id] } };
        assert!(filter.is_valid());
        assert!(filter.targets_id());
    }

    #[test]
    fn empty_macro_matches_everything() {
        assert_eq!(filter! {}, Filter::all());
        assert_eq!(filter!(), Filter::all());
    }

    #[test]
    fn display_echoes_predicates() {
        let filter = Filter::from(doc! { name: "john" });
        assert_eq!(filter.to_string(), "{\"name\": \"john\"}");
    }
}
