//! Purpose: Structured (key-value / JSON) view of element trees, plus its reverse path.
//! Exports: `StructuredSerializer`, `DecodeOptions`, `element_from_value`, `element_from_json`.
//! Role: Seam for delegated serializers and the only decoder that rebuilds trees.
//! Invariants: Default dict key order is name, description, then type_tag or id,
//!   record fields, children.
//! Invariants: Decoding rebuilds composites through `append_child`, so cycle checks apply.
//! Invariants: A document never yields two composites with the same id.
use std::collections::HashSet;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::composite::Composite;
use crate::core::element::Element;
use crate::core::error::{Error, ErrorKind};
use crate::core::field::TypedField;
use crate::core::frame::DEFAULT_MAX_DEPTH;
use crate::core::record::Record;

/// Strategy that replaces a composite's default structured rendering.
///
/// Implementations receive the composite they are attached to and must return a JSON
/// object. Building on the default shape goes through `Composite::default_dict`;
/// calling `to_dict` on the same composite from inside `serialize` recurses forever.
pub trait StructuredSerializer: Send + Sync {
    fn serialize(&self, composite: &Composite) -> Result<Value, Error>;
}

impl<F> StructuredSerializer for F
where
    F: Fn(&Composite) -> Result<Value, Error> + Send + Sync,
{
    fn serialize(&self, composite: &Composite) -> Result<Value, Error> {
        self(composite)
    }
}

pub(crate) fn field_dict(field: &TypedField) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("name".to_string(), Value::from(field.name()));
    map.insert("description".to_string(), Value::from(field.description()));
    map.insert("type_tag".to_string(), Value::from(field.type_tag().as_str()));
    map
}

pub(crate) fn to_json_string(map: Map<String, Value>) -> Result<String, Error> {
    serde_json::to_string(&Value::Object(map)).map_err(|err| {
        Error::new(ErrorKind::Serialization)
            .with_message("failed to encode structured view as json")
            .with_source(err)
    })
}

/// How decoded composites get their identities.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DecodeOptions {
    /// Assign new identities instead of restoring the document's ids.
    pub fresh_identities: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_identities(mut self, fresh_identities: bool) -> Self {
        self.fresh_identities = fresh_identities;
        self
    }
}

pub fn element_from_json(input: &str) -> Result<Element, Error> {
    element_from_json_with(input, &DecodeOptions::default())
}

pub fn element_from_json_with(input: &str, options: &DecodeOptions) -> Result<Element, Error> {
    let value: Value = serde_json::from_str(input).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("structured document is not valid json")
            .with_source(err)
    })?;
    element_from_value_with(&value, options)
}

pub fn element_from_value(value: &Value) -> Result<Element, Error> {
    element_from_value_with(value, &DecodeOptions::default())
}

pub fn element_from_value_with(value: &Value, options: &DecodeOptions) -> Result<Element, Error> {
    let mut decoder = Decoder {
        options,
        seen: HashSet::new(),
    };
    decoder.element(value, 0)
}

struct Decoder<'a> {
    options: &'a DecodeOptions,
    seen: HashSet<Uuid>,
}

impl Decoder<'_> {
    fn element(&mut self, value: &Value, depth: usize) -> Result<Element, Error> {
        if depth >= DEFAULT_MAX_DEPTH {
            return Err(Error::new(ErrorKind::Corrupt).with_message("structured document nests too deeply"));
        }
        let map = value
            .as_object()
            .ok_or_else(|| Error::new(ErrorKind::Corrupt).with_message("element must be a json object"))?;
        let name = required_str(map, "name")?;
        let description = required_str(map, "description")?;

        if let Some(tag) = map.get("type_tag") {
            let tag = tag
                .as_str()
                .ok_or_else(|| Error::new(ErrorKind::Corrupt).with_message("type_tag must be a string"))?;
            if map.contains_key("children") {
                return Err(Error::new(ErrorKind::Corrupt).with_message("typed field cannot have children"));
            }
            return Ok(Element::Field(TypedField::new(name, description, tag)?));
        }

        let Some(id) = map.get("id") else {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message("element has neither type_tag nor id")
                .with_hint("leaves carry type_tag; composites carry id and children"));
        };
        let id = id
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| Error::new(ErrorKind::Corrupt).with_message("id must be a uuid string"))?;
        if !self.seen.insert(id) {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!("composite id {id} appears more than once"))
                .with_hint("every composite in a document carries its own id"));
        }
        let identity = if self.options.fresh_identities {
            Uuid::new_v4()
        } else {
            id
        };
        let children = map
            .get("children")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::new(ErrorKind::Corrupt).with_message("composite children must be an array"))?;

        let record = Record::from_value(value)?;
        let mut composite = Composite::restore(name, description, identity, record);
        for child in children {
            composite.append_child(self.element(child, depth + 1)?)?;
        }
        Ok(Element::Composite(composite))
    }
}

fn required_str(map: &Map<String, Value>, key: &str) -> Result<String, Error> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::new(ErrorKind::Corrupt).with_message(format!("missing string field: {key}")))
}

#[cfg(test)]
mod tests {
    use super::{DecodeOptions, element_from_json, element_from_value, element_from_value_with};
    use crate::core::element::Element;
    use crate::core::error::ErrorKind;
    use serde_json::{Value, json};

    #[test]
    fn decodes_leaf() {
        let element = element_from_value(&json!({
            "name": "f1",
            "description": "desc",
            "type_tag": "INTEGER"
        }))
        .expect("decode");
        match element {
            Element::Field(field) => assert_eq!(field.name(), "f1"),
            Element::Composite(_) => panic!("expected field"),
        }
    }

    #[test]
    fn unknown_tag_surfaces_invalid_type() {
        let err = element_from_value(&json!({
            "name": "f1",
            "description": "desc",
            "type_tag": "FLOAT"
        }))
        .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn malformed_documents_are_corrupt() {
        let cases = [
            json!([]),
            json!({"name": "x"}),
            json!({"name": "x", "description": "y"}),
            json!({"name": "x", "description": "y", "id": "not-a-uuid", "children": []}),
            json!({"name": "x", "description": "y", "id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427"}),
            json!({"name": "x", "description": "y", "type_tag": 3}),
            json!({"name": "x", "description": "y", "type_tag": "TEXT", "children": []}),
        ];
        for case in cases {
            let err = element_from_value(&case).expect_err("should fail");
            assert_eq!(err.kind(), ErrorKind::Corrupt, "case: {case}");
        }
    }

    const SHARED_ID: &str = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";

    fn shared_id_siblings() -> Value {
        json!({
            "name": "outer",
            "description": "",
            "id": "6f1c2d3e-4b5a-4c6d-8e7f-901a2b3c4d5e",
            "children": [
                {"name": "left", "description": "", "id": SHARED_ID, "children": []},
                {"name": "right", "description": "", "id": SHARED_ID, "children": []}
            ]
        })
    }

    #[test]
    fn repeated_identity_in_subtree_is_corrupt() {
        let doc = json!({
            "name": "outer",
            "description": "",
            "id": SHARED_ID,
            "children": [
                {"name": "inner", "description": "", "id": SHARED_ID, "children": []}
            ]
        });
        let err = element_from_value(&doc).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn siblings_sharing_an_id_are_corrupt() {
        let err = element_from_value(&shared_id_siblings()).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(err.to_string().contains(SHARED_ID));

        let fresh = DecodeOptions::new().fresh_identities(true);
        let err = element_from_value_with(&shared_id_siblings(), &fresh).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn fresh_identities_decode_independent_copies() {
        let doc = json!({
            "name": "outer",
            "description": "",
            "id": SHARED_ID,
            "children": [{"name": "f", "description": "", "type_tag": "TEXT"}]
        });
        let fresh = DecodeOptions::new().fresh_identities(true);
        let first = element_from_value_with(&doc, &fresh).expect("decode");
        let second = element_from_value_with(&doc, &fresh).expect("decode");
        let first = first.as_composite().expect("composite");
        let mut second = match second {
            Element::Composite(composite) => composite,
            Element::Field(_) => panic!("expected composite"),
        };
        assert_ne!(first.identity().to_string(), SHARED_ID);
        assert_ne!(first.identity(), second.identity());
        assert_eq!(first.to_str().expect("to_str"), second.to_str().expect("to_str"));

        let wrapper = crate::core::composite::Composite::with_children(
            "wrapper",
            "",
            vec![element_from_value_with(&doc, &fresh).expect("decode")],
        )
        .expect("wrapper");
        second.append_child(wrapper).expect("independent copies nest");
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn invalid_json_is_corrupt() {
        let err = element_from_json("{\"name\":").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }
}
