//! Purpose: Composite elements: ordered owned children with a process-unique identity.
//! Exports: `Composite`.
//! Role: Interior node of element trees; also carries record metadata and an optional
//!   delegated structured serializer.
//! Invariants: Identity is assigned once (UUIDv4) and never reassigned.
//! Invariants: Children form a tree; no composite contains its own identity.
//! Invariants: Rendering is pure and fails as a whole if any child fails.
use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::core::element::Element;
use crate::core::error::{Error, ErrorKind};
use crate::core::frame::{self, RenderOptions};
use crate::core::record::{FilesystemFields, FilesystemMeta, Record, VirtualFolderMeta};
use crate::core::structured::{self, StructuredSerializer};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum View {
    /// What `to_dict` returns: identities included, delegates honoured.
    Published,
    /// Identity-free default shape used for content addressing.
    Content,
}

pub struct Composite {
    name: String,
    description: String,
    identity: Uuid,
    record: Record,
    children: Vec<Element>,
    serializer: Option<Box<dyn StructuredSerializer>>,
}

impl Composite {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::restore(name, description, Uuid::new_v4(), Record::Entity)
    }

    pub fn with_children(
        name: impl Into<String>,
        description: impl Into<String>,
        children: Vec<Element>,
    ) -> Result<Self, Error> {
        Self::with_record(name, description, Record::Entity, children)
    }

    pub fn filesystem(
        name: impl Into<String>,
        description: impl Into<String>,
        fields: FilesystemFields,
        children: Vec<Element>,
    ) -> Result<Self, Error> {
        let meta = FilesystemMeta::new(fields)?;
        Self::with_record(name, description, Record::Filesystem(meta), children)
    }

    pub fn virtual_folder(
        name: impl Into<String>,
        description: impl Into<String>,
        backing_path: impl Into<String>,
        children: Vec<Element>,
    ) -> Result<Self, Error> {
        let meta = VirtualFolderMeta::new(backing_path);
        Self::with_record(name, description, Record::VirtualFolder(meta), children)
    }

    pub fn with_record(
        name: impl Into<String>,
        description: impl Into<String>,
        record: Record,
        children: Vec<Element>,
    ) -> Result<Self, Error> {
        let mut composite = Self::restore(name, description, Uuid::new_v4(), record);
        for child in children {
            composite.append_child(child)?;
        }
        Ok(composite)
    }

    /// Rebuilds a composite with a known identity (structured decoding only).
    pub(crate) fn restore(
        name: impl Into<String>,
        description: impl Into<String>,
        identity: Uuid,
        record: Record,
    ) -> Self {
        let composite = Self {
            name: name.into(),
            description: description.into(),
            identity,
            record,
            children: Vec::new(),
            serializer: None,
        };
        trace!(id = %composite.identity, kind = composite.record.kind_str(), "composite created");
        composite
    }

    pub fn with_serializer(mut self, serializer: impl StructuredSerializer + 'static) -> Self {
        self.set_serializer(serializer);
        self
    }

    pub fn set_serializer(&mut self, serializer: impl StructuredSerializer + 'static) {
        self.serializer = Some(Box::new(serializer));
    }

    pub fn clear_serializer(&mut self) {
        self.serializer = None;
    }

    pub fn has_serializer(&self) -> bool {
        self.serializer.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn identity(&self) -> Uuid {
        self.identity
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Appends to the end of the children; rejects anything carrying this composite's identity.
    pub fn append_child(&mut self, element: impl Into<Element>) -> Result<(), Error> {
        let element = element.into();
        if element.contains_identity(self.identity) {
            debug!(id = %self.identity, "rejected child that would contain its parent");
            return Err(Error::new(ErrorKind::Cycle)
                .with_message(format!(
                    "composite {} cannot contain itself",
                    self.identity
                )));
        }
        self.children.push(element);
        trace!(id = %self.identity, children = self.children.len(), "child appended");
        Ok(())
    }

    /// Walks the subtree with an explicit stack; construction depth is unbounded.
    pub(crate) fn contains_identity(&self, identity: Uuid) -> bool {
        if self.identity == identity {
            return true;
        }
        let mut pending = self.children.iter().collect::<Vec<&Element>>();
        while let Some(element) = pending.pop() {
            if let Element::Composite(composite) = element {
                if composite.identity == identity {
                    return true;
                }
                pending.extend(composite.children.iter());
            }
        }
        false
    }

    pub fn to_str(&self) -> Result<String, Error> {
        self.to_str_with(&RenderOptions::default())
    }

    pub fn to_str_with(&self, options: &RenderOptions) -> Result<String, Error> {
        self.render_text(options, 0)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.to_bytes_with(&RenderOptions::default())
    }

    pub fn to_bytes_with(&self, options: &RenderOptions) -> Result<Vec<u8>, Error> {
        Ok(frame::encode_bytes(&self.to_str_with(options)?))
    }

    pub fn to_dict(&self) -> Result<Map<String, Value>, Error> {
        self.to_dict_with(&RenderOptions::default())
    }

    pub fn to_dict_with(&self, options: &RenderOptions) -> Result<Map<String, Value>, Error> {
        self.structure(options, 0, View::Published)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        structured::to_json_string(self.to_dict()?)
    }

    pub fn to_json_with(&self, options: &RenderOptions) -> Result<String, Error> {
        structured::to_json_string(self.to_dict_with(options)?)
    }

    /// Default structured view, ignoring any delegate on this composite.
    ///
    /// Children still render through their own delegates.
    pub fn default_dict(&self) -> Result<Map<String, Value>, Error> {
        self.default_structure(&RenderOptions::default(), 0, View::Published)
    }

    /// Content-derived identity: SHA-256 over the identity-free default view.
    ///
    /// Equal trees built in different runs share a content address even though their
    /// random identities differ.
    pub fn content_address(&self) -> Result<Uuid, Error> {
        let map = self.structure(&RenderOptions::default(), 0, View::Content)?;
        let canonical = structured::to_json_string(map)?;
        let digest = Sha256::digest(canonical.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Ok(Uuid::from_bytes(bytes))
    }

    pub(crate) fn render_text(&self, options: &RenderOptions, depth: usize) -> Result<String, Error> {
        options.check_depth(depth)?;
        let mut segments = Vec::with_capacity(self.children.len() + 1);
        if let Some(segment) = self.record.render_segment() {
            segments.push(segment);
        }
        for (idx, child) in self.children.iter().enumerate() {
            let text = child
                .render_text(options, depth + 1)
                .map_err(|err| self.child_failure(idx, err))?;
            segments.push(text);
        }
        Ok(frame::join_segments(&segments, options))
    }

    pub(crate) fn structure(
        &self,
        options: &RenderOptions,
        depth: usize,
        view: View,
    ) -> Result<Map<String, Value>, Error> {
        options.check_depth(depth)?;
        match (&self.serializer, view) {
            (Some(serializer), View::Published) => self.delegated(serializer.as_ref()),
            _ => self.default_structure(options, depth, view),
        }
    }

    fn default_structure(
        &self,
        options: &RenderOptions,
        depth: usize,
        view: View,
    ) -> Result<Map<String, Value>, Error> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from(self.name.as_str()));
        map.insert("description".to_string(), Value::from(self.description.as_str()));
        if view == View::Published {
            map.insert("id".to_string(), Value::from(self.identity.to_string()));
        }
        for (key, value) in self.record.entries() {
            map.insert(key.to_string(), value);
        }
        let mut children = Vec::with_capacity(self.children.len());
        for (idx, child) in self.children.iter().enumerate() {
            let child_map = child
                .structure(options, depth + 1, view)
                .map_err(|err| self.child_failure(idx, err))?;
            children.push(Value::Object(child_map));
        }
        map.insert("children".to_string(), Value::Array(children));
        Ok(map)
    }

    fn delegated(&self, serializer: &dyn StructuredSerializer) -> Result<Map<String, Value>, Error> {
        let value = serializer.serialize(self).map_err(|err| {
            debug!(id = %self.identity, error = %err, "delegated serializer failed");
            if err.kind() == ErrorKind::Serialization {
                err
            } else {
                Error::new(ErrorKind::Serialization)
                    .with_message("delegated serializer failed")
                    .with_source(err)
            }
        })?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(Error::new(ErrorKind::Serialization).with_message(format!(
                "delegated serializer produced {} instead of an object",
                json_type_name(&other)
            ))),
        }
    }

    fn child_failure(&self, idx: usize, err: Error) -> Error {
        Error::new(ErrorKind::Render)
            .with_message(format!(
                "child {idx} of composite {} failed to render",
                self.identity
            ))
            .with_source(err)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// Drops iteratively: tree depth never grows the call stack.
impl Drop for Composite {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(element) = pending.pop() {
            if let Element::Composite(mut composite) = element {
                pending.append(&mut composite.children);
            }
        }
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("identity", &self.identity)
            .field("record", &self.record)
            .field("children", &self.children)
            .field("serializer", &self.serializer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Composite;
    use crate::core::element::Element;
    use crate::core::error::{Error, ErrorKind};
    use crate::core::field::{TypeTag, TypedField};
    use crate::core::frame::RenderOptions;
    use serde_json::{Value, json};
    use std::collections::HashSet;

    fn field(name: &str, tag: TypeTag) -> Element {
        TypedField::with_tag(name, "desc", tag).into()
    }

    #[test]
    fn identities_are_distinct_and_stable() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let composite = Composite::new("", "");
            assert_eq!(composite.identity(), composite.identity());
            assert!(seen.insert(composite.identity()));
        }
    }

    #[test]
    fn to_str_joins_children_with_tokens() {
        let composite = Composite::with_children(
            "e",
            "",
            vec![field("a", TypeTag::Text), field("b", TypeTag::Real)],
        )
        .expect("composite");
        assert_eq!(
            composite.to_str().expect("to_str"),
            "a (TEXT): desc\n<im_start>\nb (REAL): desc\n<im_end>"
        );
    }

    #[test]
    fn empty_composite_renders_end_token_only() {
        let composite = Composite::new("e", "");
        assert_eq!(composite.to_str().expect("to_str"), "<im_end>");
        assert_eq!(composite.to_bytes().expect("bytes"), b"---\n<im_end>\n---".to_vec());
    }

    #[test]
    fn self_append_leaves_children_unchanged() {
        let original = Composite::with_children("e", "", vec![field("a", TypeTag::Text)])
            .expect("composite");
        let doc = original.to_json().expect("json");
        let mut twin = match Element::from_json(&doc).expect("decode") {
            Element::Composite(composite) => composite,
            Element::Field(_) => panic!("expected composite"),
        };
        let clone = Element::from_json(&doc).expect("decode");

        let err = twin.append_child(clone).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Cycle);
        assert_eq!(twin.len(), 1);
        assert_eq!(twin.to_json().expect("json"), doc);
    }

    #[test]
    fn nested_self_reference_is_rejected() {
        let outer = Composite::new("outer", "");
        let doc = outer.to_json().expect("json");
        let same_identity = Element::from_json(&doc).expect("decode");
        let wrapper = Composite::with_children("wrapper", "", vec![same_identity]).expect("wrapper");

        let mut outer = match Element::from_json(&doc).expect("decode") {
            Element::Composite(composite) => composite,
            Element::Field(_) => panic!("expected composite"),
        };
        let err = outer.append_child(wrapper).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Cycle);
        assert!(outer.is_empty());
    }

    fn decoded(doc: &str) -> Composite {
        match Element::from_json(doc).expect("decode") {
            Element::Composite(composite) => composite,
            Element::Field(_) => panic!("expected composite"),
        }
    }

    #[test]
    fn deep_chains_append_and_drop() {
        let mut current = Composite::new("leaf", "");
        for level in 0..12_000 {
            current = Composite::with_children(format!("level-{level}"), "", vec![current.into()])
                .expect("level");
        }
        let mut root = Composite::new("root", "");
        root.append_child(current).expect("append");
        assert_eq!(root.len(), 1);
        drop(root);
    }

    #[test]
    fn identity_found_at_the_bottom_of_a_deep_chain() {
        let doc = Composite::new("twin", "").to_json().expect("json");
        let bottom = decoded(&doc);
        let mut current = bottom;
        for level in 0..12_000 {
            current = Composite::with_children(format!("level-{level}"), "", vec![current.into()])
                .expect("level");
        }
        let mut other = decoded(&doc);
        let err = other.append_child(current).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Cycle);
        assert!(other.is_empty());
    }

    #[test]
    fn dict_key_order_is_fixed() {
        let composite = Composite::with_children("e", "d", vec![field("a", TypeTag::Text)])
            .expect("composite");
        let dict = composite.to_dict().expect("dict");
        let keys = dict.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(keys, ["name", "description", "id", "children"]);
        assert_eq!(dict["id"], json!(composite.identity().to_string()));
    }

    #[test]
    fn delegate_replaces_default_view() {
        let composite = Composite::new("e", "d").with_serializer(|c: &Composite| -> Result<Value, Error> {
            Ok(json!({"entity": c.name(), "size": c.len()}))
        });
        assert!(composite.has_serializer());
        assert_eq!(composite.to_json().expect("json"), r#"{"entity":"e","size":0}"#);
    }

    #[test]
    fn delegate_can_extend_default_view() {
        let composite = Composite::new("e", "d").with_serializer(|c: &Composite| -> Result<Value, Error> {
            let mut map = c.default_dict()?;
            map.insert("extra".to_string(), json!(true));
            Ok(Value::Object(map))
        });
        let dict = composite.to_dict().expect("dict");
        assert_eq!(dict["extra"], json!(true));
        assert_eq!(dict["name"], json!("e"));
    }

    #[test]
    fn clearing_delegate_restores_default() {
        let mut composite =
            Composite::new("e", "d").with_serializer(|_: &Composite| -> Result<Value, Error> {
                Ok(json!({"x": 1}))
            });
        composite.clear_serializer();
        let dict = composite.to_dict().expect("dict");
        assert!(dict.contains_key("id"));
    }

    #[test]
    fn failing_delegate_is_a_serialization_error() {
        let composite = Composite::new("e", "d").with_serializer(|_: &Composite| -> Result<Value, Error> {
            Err(Error::new(ErrorKind::InvalidValue).with_message("boom"))
        });
        let err = composite.to_json().expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert_eq!(err.root_kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn non_object_delegate_output_is_rejected() {
        let composite = Composite::new("e", "d").with_serializer(|_: &Composite| -> Result<Value, Error> {
            Ok(json!([1, 2]))
        });
        let err = composite.to_dict().expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn child_delegate_failure_fails_parent_with_render() {
        let child = Composite::new("child", "").with_serializer(|_: &Composite| -> Result<Value, Error> {
            Err(Error::new(ErrorKind::Serialization).with_message("nope"))
        });
        let parent = Composite::with_children("parent", "", vec![child.into()]).expect("parent");
        let err = parent.to_dict().expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Render);
        assert_eq!(err.root_kind(), ErrorKind::Serialization);
        // Text framing does not involve delegates.
        assert!(parent.to_str().is_ok());
    }

    #[test]
    fn depth_limit_fails_render() {
        let leaf = Composite::new("c", "");
        let middle = Composite::with_children("b", "", vec![leaf.into()]).expect("middle");
        let root = Composite::with_children("a", "", vec![middle.into()]).expect("root");

        let options = RenderOptions::new().with_max_depth(2);
        let err = root.to_str_with(&options).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Render);
        let err = root.to_dict_with(&options).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Render);

        let options = RenderOptions::new().with_max_depth(3);
        assert!(root.to_str_with(&options).is_ok());
    }

    #[test]
    fn content_address_ignores_random_identity() {
        let build = || {
            Composite::with_children("e", "d", vec![field("a", TypeTag::Text)]).expect("composite")
        };
        let first = build();
        let second = build();
        assert_ne!(first.identity(), second.identity());
        assert_eq!(
            first.content_address().expect("address"),
            second.content_address().expect("address")
        );

        let different = Composite::with_children("e", "d", vec![field("b", TypeTag::Text)])
            .expect("composite");
        assert_ne!(
            first.content_address().expect("address"),
            different.content_address().expect("address")
        );
    }

    #[test]
    fn content_address_ignores_delegates() {
        let plain = Composite::new("e", "d");
        let delegated = Composite::new("e", "d").with_serializer(|_: &Composite| -> Result<Value, Error> {
            Ok(json!({}))
        });
        assert_eq!(
            plain.content_address().expect("address"),
            delegated.content_address().expect("address")
        );
    }
}
