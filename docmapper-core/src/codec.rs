//! Conversion between records and wire documents.
//!
//! The identifier never travels inside a document body: it is the engine's native key. Encoding
//! drops it, and every read path grafts the envelope's key (and version, when tracked) back into
//! the source before decoding.

use serde_json::{Map, Value};

use crate::{
    envelope::HitEnvelope,
    error::{DocumentStoreError, DocumentStoreResult},
    field_map::{FieldMap, FieldMapping},
    record::{Record, RecordExt},
};

/// Wire form of one record, without its identifier.
pub type Document = Map<String, Value>;

/// Encodes a record into a document.
///
/// Every mapped field except the identifier is copied under its wire key, read from the record
/// under the wire key or, failing that, the field's alias. Omit-empty fields whose value is an
/// empty string or null are skipped entirely.
///
/// # Errors
///
/// Returns an error if the record does not serialize to a JSON object.
pub fn encode<R: Record>(record: &R, map: &FieldMap) -> DocumentStoreResult<Document> {
    let mut values = into_object(record.to_json()?)?;
    let mut document = Document::new();

    for field in map.fields() {
        if field.identifier {
            continue;
        }

        let Some(value) = take_field(&mut values, field) else {
            continue;
        };

        if field.omit_empty && is_empty(&value) {
            continue;
        }

        document.insert(field.key.to_string(), value);
    }

    Ok(document)
}

/// Decodes a document returned by the engine, grafting the envelope's key and version.
///
/// # Errors
///
/// Returns an error if the merged document does not deserialize into `R`.
pub fn decode<R: Record>(
    mut source: Document,
    id: &str,
    version: Option<i64>,
    map: &FieldMap,
) -> DocumentStoreResult<R> {
    source.insert(map.id_key().to_string(), Value::String(id.to_string()));

    if let (Some(key), Some(version)) = (map.version_key(), version) {
        source.insert(key.to_string(), Value::from(version));
    }

    // Key overrides the record's serde form does not know about are also offered by name.
    for field in map.fields() {
        let Some(alias) = field.alias else {
            continue;
        };
        if source.contains_key(alias) {
            continue;
        }
        if let Some(value) = source.get(field.key).cloned() {
            source.insert(alias.to_string(), value);
        }
    }

    R::from_json(Value::Object(source))
}

/// Decodes the source of a hit envelope.
pub fn decode_hit<R: Record>(hit: HitEnvelope, map: &FieldMap) -> DocumentStoreResult<R> {
    let source = hit.source.unwrap_or_default();

    decode(source, &hit.id, hit.version, map)
}

/// Reads the identifier of a record through its field map.
///
/// A missing or null identifier reads as an empty string.
///
/// # Errors
///
/// Returns an error if the record does not serialize to an object or the identifier is not a
/// string.
pub fn identifier_of<R: Record>(record: &R, map: &FieldMap) -> DocumentStoreResult<String> {
    let mut values = into_object(record.to_json()?)?;

    match take_field(&mut values, map.identifier()) {
        Some(Value::String(id)) => Ok(id),
        None | Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(DocumentStoreError::Serialization(format!(
            "identifier '{}' must be a string, got {}",
            map.id_key(),
            other
        ))),
    }
}

/// Removes the identifier from a patch document and returns it.
///
/// # Errors
///
/// Fails without touching the document when the key is absent or its value is not a string.
pub fn take_identifier(document: &mut Document, key: &str) -> DocumentStoreResult<String> {
    match document.remove(key) {
        Some(Value::String(id)) => Ok(id),
        Some(other) => {
            document.insert(key.to_string(), other);

            Err(DocumentStoreError::InvalidPatch(format!("{key} must be a string for patch")))
        }
        None => Err(DocumentStoreError::InvalidPatch(format!(
            "{key} must be in the document for patch"
        ))),
    }
}

/// Puts an identifier taken with [`take_identifier`] back into the document.
pub fn restore_identifier(document: &mut Document, key: &str, id: String) {
    document.insert(key.to_string(), Value::String(id));
}

fn take_field(values: &mut Document, field: &FieldMapping) -> Option<Value> {
    values
        .remove(field.key)
        .or_else(|| field.alias.and_then(|alias| values.remove(alias)))
}

fn into_object(value: Value) -> DocumentStoreResult<Document> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(DocumentStoreError::Serialization(format!(
            "record must serialize to an object, got {other}"
        ))),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field_map::FieldMapOptions,
        record::{FieldDescriptor, FieldKind},
    };
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct User {
        id: String,
        username: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        phone: String,
        #[serde(rename = "dateOfBirth", default)]
        date_of_birth: Option<String>,
        #[serde(default)]
        version: i64,
    }

    impl Record for User {
        fn fields() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] = &[
                FieldDescriptor::new("id", FieldKind::String).identifier(),
                FieldDescriptor::new("username", FieldKind::String),
                FieldDescriptor::new("email", FieldKind::Optional).omit_empty(),
                FieldDescriptor::new("phone", FieldKind::String).omit_empty(),
                FieldDescriptor::new("date_of_birth", FieldKind::Optional).key("dateOfBirth"),
                FieldDescriptor::new("version", FieldKind::Number).version(),
            ];
            FIELDS
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: String,
        label: String,
        hits: i64,
    }

    impl Record for Counter {
        fn fields() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] = &[
                FieldDescriptor::new("id", FieldKind::String).identifier(),
                FieldDescriptor::new("label", FieldKind::String),
                FieldDescriptor::new("hits", FieldKind::Number),
            ];
            FIELDS
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Person {
        person_id: String,
        #[serde(default)]
        date_of_birth: Option<String>,
    }

    impl Record for Person {
        fn fields() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] = &[
                FieldDescriptor::new("person_id", FieldKind::String).identifier().key("personId"),
                FieldDescriptor::new("date_of_birth", FieldKind::Optional).key("dateOfBirth"),
            ];
            FIELDS
        }
    }

    fn user_map() -> FieldMap {
        FieldMap::build::<User>(&FieldMapOptions::default()).unwrap()
    }

    #[test]
    fn encode_drops_identifier_and_empty_optional_fields() {
        let user = User {
            id: "u1".to_string(),
            username: "tony".to_string(),
            email: None,
            phone: String::new(),
            date_of_birth: Some("1990-01-01".to_string()),
            version: 3,
        };

        let document = encode(&user, &user_map()).unwrap();

        assert_eq!(
            Value::Object(document),
            json!({ "username": "tony", "dateOfBirth": "1990-01-01", "version": 3 }),
        );
    }

    #[test]
    fn encode_keeps_empty_values_without_omit_empty() {
        let map = FieldMap::build::<Counter>(&FieldMapOptions::default()).unwrap();
        let counter = Counter { id: "c1".to_string(), label: String::new(), hits: 0 };

        let document = encode(&counter, &map).unwrap();

        assert_eq!(Value::Object(document), json!({ "label": "", "hits": 0 }));
    }

    #[test]
    fn round_trip_restores_record_without_omit_empty_fields() {
        let map = FieldMap::build::<Counter>(&FieldMapOptions::default()).unwrap();
        let counter = Counter { id: "c1".to_string(), label: "home".to_string(), hits: 42 };

        let document = encode(&counter, &map).unwrap();
        let decoded: Counter = decode(document, "c1", None, &map).unwrap();

        assert_eq!(decoded, counter);
    }

    #[test]
    fn key_override_without_serde_rename_round_trips() {
        let map = FieldMap::build::<Person>(&FieldMapOptions::default()).unwrap();
        let person = Person {
            person_id: "p1".to_string(),
            date_of_birth: Some("1990-01-01".to_string()),
        };

        let document = encode(&person, &map).unwrap();
        assert_eq!(Value::Object(document.clone()), json!({ "dateOfBirth": "1990-01-01" }));
        assert_eq!(identifier_of(&person, &map).unwrap(), "p1");

        let decoded: Person = decode(document, "p1", None, &map).unwrap();
        assert_eq!(decoded, person);
    }

    #[test]
    fn omitted_empty_fields_decode_to_defaults() {
        let map = user_map();
        let user = User {
            id: "u1".to_string(),
            username: "tony".to_string(),
            ..Default::default()
        };

        let document = encode(&user, &map).unwrap();
        assert!(!document.contains_key("phone"));

        let decoded: User = decode(document, "u1", None, &map).unwrap();
        assert_eq!(decoded, user);
    }

    #[test]
    fn decode_grafts_identifier_and_version() {
        let source = json!({ "username": "tony", "version": 1 });
        let Value::Object(source) = source else { unreachable!() };

        let decoded: User = decode(source, "native-key", Some(7), &user_map()).unwrap();

        assert_eq!(decoded.id, "native-key");
        assert_eq!(decoded.version, 7);
    }

    #[test]
    fn decode_ignores_version_when_not_tracked() {
        const SHAPE: &[FieldDescriptor] = &[
            FieldDescriptor::new("id", FieldKind::String).identifier(),
            FieldDescriptor::new("username", FieldKind::String),
        ];
        let options = FieldMapOptions::new().with_version_field("missing");
        let map = FieldMap::from_descriptors("User", SHAPE, &options).unwrap();
        let Value::Object(source) = json!({ "username": "tony", "version": 1 }) else {
            unreachable!()
        };

        let decoded: User = decode(source, "u1", Some(9), &map).unwrap();

        assert_eq!(decoded.version, 1);
    }

    #[test]
    fn identifier_is_read_through_the_map() {
        let user = User { id: "u9".to_string(), ..Default::default() };

        assert_eq!(identifier_of(&user, &user_map()).unwrap(), "u9");
    }

    #[test]
    fn take_and_restore_identifier() {
        let Value::Object(mut patch) = json!({ "id": "u1", "username": "new" }) else {
            unreachable!()
        };

        let id = take_identifier(&mut patch, "id").unwrap();
        assert_eq!(id, "u1");
        assert!(!patch.contains_key("id"));

        restore_identifier(&mut patch, "id", id);
        assert_eq!(patch.get("id"), Some(&json!("u1")));
    }

    #[test]
    fn take_identifier_rejects_missing_or_non_string_keys() {
        let Value::Object(mut missing) = json!({ "username": "new" }) else { unreachable!() };
        let Value::Object(mut numeric) = json!({ "id": 5 }) else { unreachable!() };

        assert!(matches!(
            take_identifier(&mut missing, "id"),
            Err(DocumentStoreError::InvalidPatch(_)),
        ));
        assert!(matches!(
            take_identifier(&mut numeric, "id"),
            Err(DocumentStoreError::InvalidPatch(_)),
        ));
        assert_eq!(numeric.get("id"), Some(&json!(5)));
    }
}
