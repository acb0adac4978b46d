//! Purpose: Fixed metadata carried by record-flavoured composites.
//! Exports: `Record`, `FilesystemFields`, `FilesystemMeta`, `VirtualFolderMeta`.
//! Role: Extra fields folded into a composite's frame and structured view.
//! Invariants: Numeric filesystem fields are non-negative; strings are not inspected.
//! Invariants: Field order in renderings is fixed and identical across frame and dict.
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::error::{Error, ErrorKind};
use crate::core::frame;

/// Caller-facing input for a filesystem record; validated by `FilesystemMeta::new`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct FilesystemFields {
    pub inode: i64,
    pub pathname: String,
    pub filetype: String,
    pub permissions: String,
    pub owner: String,
    pub group_id: i64,
    pub process_id: i64,
    pub unit_file: Option<String>,
    pub unit_file_addr: Option<String>,
    pub size: i64,
    pub mtime: String,
    pub atime: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilesystemMeta {
    inode: u64,
    pathname: String,
    filetype: String,
    permissions: String,
    owner: String,
    group_id: u64,
    process_id: u64,
    unit_file: Option<String>,
    unit_file_addr: Option<String>,
    size: u64,
    mtime: String,
    atime: String,
}

impl FilesystemMeta {
    pub fn new(fields: FilesystemFields) -> Result<Self, Error> {
        Ok(Self {
            inode: non_negative("inode", fields.inode)?,
            pathname: fields.pathname,
            filetype: fields.filetype,
            permissions: fields.permissions,
            owner: fields.owner,
            group_id: non_negative("group_id", fields.group_id)?,
            process_id: non_negative("process_id", fields.process_id)?,
            unit_file: fields.unit_file,
            unit_file_addr: fields.unit_file_addr,
            size: non_negative("size", fields.size)?,
            mtime: fields.mtime,
            atime: fields.atime,
        })
    }

    pub fn inode(&self) -> u64 {
        self.inode
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn filetype(&self) -> &str {
        &self.filetype
    }

    pub fn permissions(&self) -> &str {
        &self.permissions
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    pub fn process_id(&self) -> u64 {
        self.process_id
    }

    pub fn unit_file(&self) -> Option<&str> {
        self.unit_file.as_deref()
    }

    pub fn unit_file_addr(&self) -> Option<&str> {
        self.unit_file_addr.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mtime(&self) -> &str {
        &self.mtime
    }

    pub fn atime(&self) -> &str {
        &self.atime
    }

    fn entries(&self) -> Vec<(&'static str, Value)> {
        let mut entries = vec![
            ("inode", json!(self.inode)),
            ("pathname", json!(self.pathname)),
            ("filetype", json!(self.filetype)),
            ("permissions", json!(self.permissions)),
            ("owner", json!(self.owner)),
            ("group_id", json!(self.group_id)),
            ("process_id", json!(self.process_id)),
        ];
        if let Some(unit_file) = &self.unit_file {
            entries.push(("unit_file", json!(unit_file)));
        }
        if let Some(unit_file_addr) = &self.unit_file_addr {
            entries.push(("unit_file_addr", json!(unit_file_addr)));
        }
        entries.push(("size", json!(self.size)));
        entries.push(("mtime", json!(self.mtime)));
        entries.push(("atime", json!(self.atime)));
        entries
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VirtualFolderMeta {
    backing_path: String,
}

impl VirtualFolderMeta {
    pub fn new(backing_path: impl Into<String>) -> Self {
        Self {
            backing_path: backing_path.into(),
        }
    }

    pub fn backing_path(&self) -> &str {
        &self.backing_path
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Record {
    #[default]
    Entity,
    Filesystem(FilesystemMeta),
    VirtualFolder(VirtualFolderMeta),
}

impl Record {
    /// Ordered `(key, value)` pairs contributed to renderings; empty for plain entities.
    pub fn entries(&self) -> Vec<(&'static str, Value)> {
        match self {
            Record::Entity => Vec::new(),
            Record::Filesystem(meta) => meta.entries(),
            Record::VirtualFolder(meta) => vec![("backing_path", json!(meta.backing_path))],
        }
    }

    /// `key: value` lines for the frame; `None` when the record adds nothing.
    pub fn render_segment(&self) -> Option<String> {
        let entries = self.entries();
        if entries.is_empty() {
            return None;
        }
        let lines = entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(text) => format!("{key}: {}", frame::single_line(&text)),
                other => format!("{key}: {other}"),
            })
            .collect::<Vec<_>>();
        Some(lines.join("\n"))
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Record::Entity => "entity",
            Record::Filesystem(_) => "filesystem",
            Record::VirtualFolder(_) => "virtual_folder",
        }
    }

    /// Infers the record flavour of a structured document from its keys.
    pub(crate) fn from_value(value: &Value) -> Result<Self, Error> {
        if value.get("pathname").is_some() {
            let fields = FilesystemFields::deserialize(value).map_err(|err| {
                Error::new(ErrorKind::Corrupt)
                    .with_message("malformed filesystem record")
                    .with_source(err)
            })?;
            return Ok(Record::Filesystem(FilesystemMeta::new(fields)?));
        }
        if let Some(backing_path) = value.get("backing_path") {
            let backing_path = backing_path.as_str().ok_or_else(|| {
                Error::new(ErrorKind::Corrupt).with_message("backing_path must be a string")
            })?;
            return Ok(Record::VirtualFolder(VirtualFolderMeta::new(backing_path)));
        }
        Ok(Record::Entity)
    }
}

fn non_negative(field: &str, value: i64) -> Result<u64, Error> {
    u64::try_from(value).map_err(|_| {
        Error::new(ErrorKind::InvalidValue)
            .with_message(format!("{field} must be non-negative (got {value})"))
    })
}
