//! neckstudio - stringed-instrument neck diagram studio.
//!
//! This library provides the fretboard model, theory labeling, canvas
//! tiling and project persistence behind the neckstudio CLI.

pub mod app;
pub mod drag;
pub mod neck;
pub mod render;
pub mod store;
pub mod tiling;

// Re-export commonly used types
pub use app::{Studio, AUTOSAVE_DELAY};
pub use neck::{LabelMode, NeckConfig, NeckDiagram, Note, ProjectData, ProjectRecord};
pub use store::{JsonFileStore, MemoryStore, ProjectStore, StoreError};
