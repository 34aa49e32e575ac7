// Vidmarks shared type definitions
// Each submodule defines types used across the contexts.

pub mod bookmark;
pub mod errors;
pub mod message;
pub mod settings;
