//! Purpose: Write "virtual files": text or key-value content wrapped in `---` boundaries.
//! Exports: `VirtualContent`, `WriteOptions`, `write_virtual_file`, `write_element`,
//!   `render_virtual_content`.
//! Role: Filesystem collaborator for element frames; the element core never does I/O.
//! Invariants: Files use the same boundary wrapping as `Element::to_bytes`.
//! Invariants: Existing files are only replaced when `WriteOptions::overwrite` is set.
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::element::Element;
use crate::core::error::{Error, ErrorKind};
use crate::core::frame;

#[derive(Clone, Debug, PartialEq)]
pub enum VirtualContent {
    Text(String),
    /// Rendered as `key: value` lines; non-string values use compact JSON.
    Mapping(Map<String, Value>),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WriteOptions {
    pub overwrite: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

pub fn render_virtual_content(content: &VirtualContent) -> String {
    match content {
        VirtualContent::Text(text) => frame::wrap_boundary(text),
        VirtualContent::Mapping(map) => {
            let lines = map
                .iter()
                .map(|(key, value)| match value {
                    Value::String(text) => format!("{key}: {text}"),
                    other => format!("{key}: {other}"),
                })
                .collect::<Vec<_>>();
            frame::wrap_boundary(&lines.join("\n"))
        }
    }
}

pub fn write_virtual_file(
    path: impl AsRef<Path>,
    content: &VirtualContent,
    options: WriteOptions,
) -> Result<PathBuf, Error> {
    let rendered = render_virtual_content(content);
    write_payload(path.as_ref(), rendered.as_bytes(), options)
}

pub fn write_element(
    path: impl AsRef<Path>,
    element: &Element,
    options: WriteOptions,
) -> Result<PathBuf, Error> {
    let bytes = element.to_bytes()?;
    write_payload(path.as_ref(), &bytes, options)
}

fn write_payload(path: &Path, payload: &[u8], options: WriteOptions) -> Result<PathBuf, Error> {
    if !options.overwrite && path.exists() {
        return Err(Error::new(ErrorKind::AlreadyExists)
            .with_message("virtual file already exists")
            .with_path(path)
            .with_hint("Pass WriteOptions::new().overwrite(true) to replace it."));
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to create virtual file directory")
                .with_path(parent)
                .with_source(err)
        })?;
    }
    std::fs::write(path, payload).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write virtual file")
            .with_path(path)
            .with_source(err)
    })?;
    debug!(path = %path.display(), bytes = payload.len(), "virtual file written");
    Ok(path.to_path_buf())
}
