//! Purpose: Define the stable public Rust API boundary for `ele`.
//! Exports: Element model types, render options, framing helpers, and errors.
//! Role: Public, additive-only surface; hides crate-internal rendering plumbing.
//! Invariants: Callers build trees and render them only through these types.
//! Invariants: Nothing re-exported here performs I/O.

pub use crate::core::composite::Composite;
pub use crate::core::element::Element;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::field::{TypeTag, TypedField};
pub use crate::core::frame::{
    FRAME_BOUNDARY, RenderOptions, SEGMENT_END, SEGMENT_START, decode_bytes, split_segments,
};
pub use crate::core::record::{FilesystemFields, FilesystemMeta, Record, VirtualFolderMeta};
pub use crate::core::structured::{DecodeOptions, StructuredSerializer};
