//! Template engine integration
//!
//! The layout layer only needs one thing from a template engine: render a
//! named view, wrapped in the configured layout, with a [`ViewData`] context.
//! [`TemplateEngine`] is that seam; [`MiniJinjaEngine`] is the implementation
//! used by [`crate::render::Renderer::new`].
//!
//! Template layout on disk, with the default configuration:
//!
//! ```text
//! templates/
//! ├── layouts/index.html     master layout, prints {{ content }}
//! ├── partials/header.html   included as {% include "partials/header" %}
//! └── home.html              a view
//! ```

use crate::data::ViewData;
use crate::error::LayoutError;

mod discovery;
mod engine;
pub mod functions;

pub use discovery::discover_partials;
pub use engine::{EngineConfig, MiniJinjaEngine, CONTENT_KEY};
pub use functions::FunctionSet;

/// Renders views into their layout
#[cfg_attr(test, mockall::automock)]
pub trait TemplateEngine: Send + Sync {
    /// Render `view` with `context`, returning the full document
    ///
    /// # Errors
    ///
    /// Returns an error if a template is missing or fails to execute.
    fn render(&self, view: &str, context: &ViewData) -> Result<String, LayoutError>;
}
