// Core modules implementing the element model, framing, structured views, and errors.
pub mod composite;
pub mod element;
pub mod error;
pub mod field;
pub mod frame;
pub mod record;
pub mod structured;
