//! Purpose: Typed leaf values of the element model.
//! Exports: `TypeTag`, `TypedField`.
//! Role: The only leaf variant an `Element` tree can hold.
//! Invariants: Type tags come from a closed set; textual tags outside it are rejected.
//! Invariants: Fields are immutable once built; change means reconstruction.
use std::fmt;

use crate::core::error::{Error, ErrorKind};
use crate::core::frame;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TypeTag {
    Text,
    Integer,
    Real,
    Blob,
    Varchar,
    Boolean,
    Ufs,
    Vector,
    Timestamp,
    Embedding,
}

impl TypeTag {
    pub const ALL: [TypeTag; 10] = [
        TypeTag::Text,
        TypeTag::Integer,
        TypeTag::Real,
        TypeTag::Blob,
        TypeTag::Varchar,
        TypeTag::Boolean,
        TypeTag::Ufs,
        TypeTag::Vector,
        TypeTag::Timestamp,
        TypeTag::Embedding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Text => "TEXT",
            TypeTag::Integer => "INTEGER",
            TypeTag::Real => "REAL",
            TypeTag::Blob => "BLOB",
            TypeTag::Varchar => "VARCHAR",
            TypeTag::Boolean => "BOOLEAN",
            TypeTag::Ufs => "UFS",
            TypeTag::Vector => "VECTOR",
            TypeTag::Timestamp => "TIMESTAMP",
            TypeTag::Embedding => "EMBEDDING",
        }
    }

    /// Exact, case-sensitive match against the closed set.
    pub fn parse(tag: &str) -> Result<Self, Error> {
        TypeTag::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == tag)
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidType)
                    .with_message(format!("invalid data type: {tag}"))
                    .with_hint(allowed_hint())
            })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn allowed_hint() -> String {
    let allowed = TypeTag::ALL
        .iter()
        .map(|tag| tag.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("allowed types: {allowed}")
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypedField {
    name: String,
    description: String,
    type_tag: TypeTag,
}

impl TypedField {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        type_tag: &str,
    ) -> Result<Self, Error> {
        let type_tag = TypeTag::parse(type_tag)?;
        Ok(Self::with_tag(name, description, type_tag))
    }

    pub fn with_tag(name: impl Into<String>, description: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            type_tag,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Single descriptive line: `name (TAG): description`.
    ///
    /// Line breaks inside the name or description are escaped as `\n` / `\r`.
    pub fn render_line(&self) -> String {
        format!(
            "{} ({}): {}",
            frame::single_line(&self.name),
            self.type_tag,
            frame::single_line(&self.description)
        )
    }
}
