//! acton-layout: layout rendering for axum handlers
//!
//! Sits between a route handler and the template engine. A handler names a
//! view and lists the data providers that feed it; acton-layout runs the
//! providers for the current request, merges what they return, collects the
//! errors worth showing to the user, and renders the view inside the master
//! layout with the discovered partials available. The client always gets a
//! response: a failed render falls back to a short plain-text message.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use acton_layout::prelude::*;
//! use axum::{routing::get, Router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     acton_layout::observability::init()?;
//!
//!     let renderer = Renderer::builder()
//!         .config(LayoutConfig::builder().templates_path("templates").layout("index"))
//!         .default_data(StaticData::new(json!({ "app_name": "acton" })))
//!         .build()?;
//!
//!     let dashboard = from_fn(|_parts: &Parts| async {
//!         Data::from_value(json!({ "title": "Dashboard" }))
//!             .with_error(DataError::user("loading widgets", "a widget is unavailable"))
//!     });
//!
//!     let app = Router::new()
//!         .route("/", get(renderer.view("home", Vec::new())))
//!         .route("/dashboard", get(renderer.view("dashboard", vec![provider(dashboard)])));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Errors reaching the page
//!
//! A provider reports failure through [`error::DataError`]. `User` errors
//! carry a message meant for the visitor; it is rendered under the
//! configured error key (`errors` by default) with its first letter
//! capitalised. `Internal` errors are logged and never rendered. See
//! [`config::ErrorMode`] for how messages are laid out in the context.

#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod data;
pub mod error;
pub mod observability;
pub mod render;
pub mod template;

#[cfg(test)]
mod testing;

/// Commonly used types
pub mod prelude {
    //! Prelude re-exporting the types a handler module needs
    //!
    //! ```rust
    //! use acton_layout::prelude::*;
    //! ```

    pub use crate::config::{Delimiters, ErrorMode, LayoutConfig, LayoutConfigBuilder, LayoutOption};
    pub use crate::data::{from_fn, Data, DataProvider, SharedProvider, StaticData, ViewData};
    pub use crate::error::{classify, Classified, DataError, LayoutError};
    pub use crate::render::{provider, Renderer, RendererBuilder, ViewHandler};
    pub use crate::template::{FunctionSet, MiniJinjaEngine, TemplateEngine};

    pub use http::request::Parts;
    pub use serde_json::json;
}
