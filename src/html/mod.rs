//! HTML import pipeline.

pub mod text;
pub mod transform;

pub use transform::{classify, HtmlImporter, NodeClass};
