//! Purpose: The element capability over the closed variant set {field, composite}.
//! Exports: `Element`.
//! Role: Entry point for every rendering (`to_str`, `to_bytes`, `to_dict`, `to_json`).
//! Invariants: `to_bytes` is always `frame::encode_bytes(to_str)`; no variant overrides it.
//! Invariants: Rendering never mutates the tree.
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::composite::{Composite, View};
use crate::core::error::Error;
use crate::core::field::TypedField;
use crate::core::frame::{self, RenderOptions};
use crate::core::structured::{self, DecodeOptions};

#[derive(Debug)]
pub enum Element {
    Field(TypedField),
    Composite(Composite),
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::Field(field) => field.name(),
            Element::Composite(composite) => composite.name(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Element::Field(field) => field.description(),
            Element::Composite(composite) => composite.description(),
        }
    }

    pub fn as_field(&self) -> Option<&TypedField> {
        match self {
            Element::Field(field) => Some(field),
            Element::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Element::Field(_) => None,
            Element::Composite(composite) => Some(composite),
        }
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

    /// Rebuilds a tree from its default structured view, keeping composite identities.
    ///
    /// The result is a restored copy: its composites carry the ids found in the document,
    /// so decoding the same document twice yields two trees sharing identities, and the
    /// cycle check treats them as the same composites. Use `from_value_with` and
    /// `DecodeOptions::fresh_identities` to decode an independent tree instead.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        structured::element_from_value(value)
    }

    pub fn from_value_with(value: &Value, options: &DecodeOptions) -> Result<Self, Error> {
        structured::element_from_value_with(value, options)
    }

    /// JSON-text form of `from_value`; the same restored-copy caveat applies.
    pub fn from_json(input: &str) -> Result<Self, Error> {
        structured::element_from_json(input)
    }

    pub fn from_json_with(input: &str, options: &DecodeOptions) -> Result<Self, Error> {
        structured::element_from_json_with(input, options)
    }

    pub(crate) fn render_text(&self, options: &RenderOptions, depth: usize) -> Result<String, Error> {
        match self {
            Element::Field(field) => {
                options.check_depth(depth)?;
                Ok(field.render_line())
            }
            Element::Composite(composite) => composite.render_text(options, depth),
        }
    }

    pub(crate) fn structure(
        &self,
        options: &RenderOptions,
        depth: usize,
        view: View,
    ) -> Result<Map<String, Value>, Error> {
        match self {
            Element::Field(field) => {
                options.check_depth(depth)?;
                Ok(structured::field_dict(field))
            }
            Element::Composite(composite) => composite.structure(options, depth, view),
        }
    }

    pub(crate) fn contains_identity(&self, identity: Uuid) -> bool {
        match self {
            Element::Field(_) => false,
            Element::Composite(composite) => composite.contains_identity(identity),
        }
    }
}

impl From<TypedField> for Element {
    fn from(field: TypedField) -> Self {
        Element::Field(field)
    }
}

impl From<Composite> for Element {
    fn from(composite: Composite) -> Self {
        Element::Composite(composite)
    }
}
