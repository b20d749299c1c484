//! Markup translation layer
//!
//! Converts between human-editable markup text and the remote block model:
//! [`translate::translate`] parses markup into block descriptors for the
//! write path, [`render::MarkupRenderer`] turns fetched blocks back into
//! markup for the read path. The two directions mirror each other; every
//! supported single construct round-trips exactly, while non-creatable
//! block types take a documented lossy substitute on the write path.

pub mod inline;
pub mod lang;
pub mod render;
pub mod translate;

pub use render::{MarkupRenderer, TabularGrid, TabularSource};
pub use translate::translate;
