use docgate::collection::{Document, DocumentId};
use docgate::common::{Value, DOC_ID};
use docgate::errors::{ErrorKind, GatewayError, GatewayResult};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document as BsonDocument};

/// Encodes a document as BSON, keeping field order.
pub fn to_bson_document(document: &Document) -> BsonDocument {
    let mut bson = BsonDocument::new();
    for (key, value) in document.iter() {
        bson.insert(key.clone(), to_bson(value));
    }
    bson
}

pub(crate) fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::I32(n) => Bson::Int32(*n),
        Value::I64(n) => Bson::Int64(*n),
        Value::F64(n) => Bson::Double(*n),
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
        Value::Document(document) => Bson::Document(to_bson_document(document)),
        Value::Id(id) => id_to_bson(id),
    }
}

pub(crate) fn id_to_bson(id: &DocumentId) -> Bson {
    if let Some(bytes) = id.bytes() {
        Bson::ObjectId(ObjectId::from_bytes(bytes))
    } else if let Some(n) = id.as_i64() {
        Bson::Int64(n)
    } else {
        Bson::String(id.to_string())
    }
}

/// Decodes a BSON record into a document.
///
/// The `_id` field becomes a [DocumentId] whether the store holds an object
/// id, a string or an integer. Any BSON type without a [Value] counterpart
/// (dates, binary, decimals, ...) is a `DecodingError`.
pub fn from_bson_document(bson: BsonDocument) -> GatewayResult<Document> {
    let mut document = Document::new();
    for (key, value) in bson {
        let value = if key == DOC_ID {
            Value::Id(id_from_bson(&value)?)
        } else {
            from_bson(value, &key)?
        };
        document.put_field(&key, value).map_err(|err| {
            GatewayError::new_with_cause(
                &format!("cannot decode field '{}'", key),
                ErrorKind::DecodingError,
                err,
            )
        })?;
    }
    Ok(document)
}

pub(crate) fn id_from_bson(bson: &Bson) -> GatewayResult<DocumentId> {
    match bson {
        Bson::ObjectId(oid) => Ok(DocumentId::from_bytes(oid.bytes())),
        Bson::String(s) => Ok(DocumentId::from_text(s)),
        Bson::Int32(n) => Ok(DocumentId::from_i64(*n as i64)),
        Bson::Int64(n) => Ok(DocumentId::from_i64(*n)),
        other => Err(unsupported(DOC_ID, other)),
    }
}

fn from_bson(bson: Bson, field: &str) -> GatewayResult<Value> {
    match bson {
        Bson::Null | Bson::Undefined => Ok(Value::Null),
        Bson::Boolean(b) => Ok(Value::Bool(b)),
        Bson::Int32(n) => Ok(Value::I32(n)),
        Bson::Int64(n) => Ok(Value::I64(n)),
        Bson::Double(n) => Ok(Value::F64(n)),
        Bson::String(s) => Ok(Value::String(s)),
        Bson::ObjectId(oid) => Ok(Value::Id(DocumentId::from_bytes(oid.bytes()))),
        Bson::Array(items) => items
            .into_iter()
            .map(|item| from_bson(item, field))
            .collect::<GatewayResult<Vec<_>>>()
            .map(Value::Array),
        Bson::Document(nested) => from_bson_document(nested).map(Value::Document),
        other => Err(unsupported(field, &other)),
    }
}

fn unsupported(field: &str, bson: &Bson) -> GatewayError {
    log::error!("Unsupported BSON type {:?} in field {}", bson.element_type(), field);
    GatewayError::new(
        &format!(
            "unsupported BSON type {:?} in field '{}'",
            bson.element_type(),
            field
        ),
        ErrorKind::DecodingError,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate::doc;
    use mongodb::bson::{self, DateTime};

    #[test]
    fn encodes_in_field_order() {
        let document = doc! { z: 1, a: "x", m: [true, (Value::Null)] };
        let bson = to_bson_document(&document);
        let keys: Vec<&str> = bson.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(bson.get("m"), Some(&Bson::Array(vec![Bson::Boolean(true), Bson::Null])));
    }

    #[test]
    fn object_id_maps_to_document_id() {
        let oid = ObjectId::new();
        let bson = bson::doc! { "_id": oid, "name": "john", "owner": oid };
        let document = from_bson_document(bson).unwrap();
        let id = document.id().unwrap();
        assert_eq!(id.to_string(), oid.to_hex());
        assert_eq!(document.get("owner"), Some(&Value::Id(id.clone())));
        assert_eq!(id_to_bson(id), Bson::ObjectId(oid));
    }

    #[test]
    fn text_and_integer_ids() {
        let text = from_bson_document(bson::doc! { "_id": "user-1" }).unwrap();
        assert_eq!(text.id().and_then(|id| id.as_text()), Some("user-1"));

        let int = from_bson_document(bson::doc! { "_id": 42_i32 }).unwrap();
        assert_eq!(int.id().and_then(|id| id.as_i64()), Some(42));
        assert_eq!(id_to_bson(int.id().unwrap()), Bson::Int64(42));
    }

    #[test]
    fn nested_values_decode() {
        let bson = bson::doc! {
            "name": "john",
            "age": 42_i64,
            "score": 7.5,
            "address": { "city": "Berlin" },
            "tags": ["a", "b"],
        };
        let document = from_bson_document(bson).unwrap();
        assert_eq!(document.get("address.city"), Some(&Value::from("Berlin")));
        assert_eq!(document.get("age"), Some(&Value::I64(42)));
        assert_eq!(document.get("tags.1"), Some(&Value::from("b")));
    }

    #[test]
    fn dotted_field_names_are_kept() {
        let document = from_bson_document(bson::doc! { "a.b": 1 }).unwrap();
        assert!(document.contains_key("a.b"));
    }

    #[test]
    fn unsupported_types_fail_to_decode() {
        let err = from_bson_document(bson::doc! { "at": DateTime::now() })
            .err()
            .unwrap();
        assert_eq!(err.kind(), &ErrorKind::DecodingError);
        assert!(err.message().contains("at"));

        let err = from_bson_document(bson::doc! { "_id": 1.5 }).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::DecodingError);
    }
}
