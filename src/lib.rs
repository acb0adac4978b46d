//! Purpose: Composite element model with canonical text framing and structured views.
//! Exports: `api` (stable surface), `core` (model, framing, errors), `vfile` (file writer).
//! Role: Library crate; callers build element trees and render them as frames or JSON.
//! Invariants: `core` is pure and synchronous; only `vfile` touches the filesystem.
//! Invariants: Diagnostics go through `tracing`; the crate never installs a subscriber.
pub mod api;
pub mod core;
pub mod vfile;
