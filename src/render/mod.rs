//! Rendering of pipeline output into a viewable map document.
//!
//! Renderers only consume the assembled GeoJSON; nothing here feeds back
//! into the geometry stages.

mod html;
mod style;

pub use html::HtmlMapRenderer;
pub use style::MapStyle;

use crate::pipeline::PipelineOutput;

/// Turns a completed pipeline run into a document.
pub trait Renderer {
    fn render(&self, output: &PipelineOutput) -> anyhow::Result<String>;
}
