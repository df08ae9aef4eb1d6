//! Hands the merged context to the template engine and turns the outcome
//! into a response
//!
//! The status is always `200 OK`. When the engine fails, or panics, the
//! failure and the full context are logged and the configured fallback text
//! is sent instead of the document.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;

use crate::config::LayoutConfig;
use crate::data::ViewData;
use crate::error::LayoutError;
use crate::template::TemplateEngine;

/// Renders one view and never fails
#[derive(Clone, Copy)]
pub struct RenderInvoker<'a> {
    engine: &'a dyn TemplateEngine,
    config: &'a LayoutConfig,
}

impl<'a> RenderInvoker<'a> {
    /// Invoker over `engine` using the fallback and debug settings of `config`
    #[must_use]
    pub const fn new(engine: &'a dyn TemplateEngine, config: &'a LayoutConfig) -> Self {
        Self { engine, config }
    }

    /// Render `view` with `context`
    pub fn invoke(&self, view: &str, context: &ViewData) -> Response {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.engine.render(view, context)))
            .unwrap_or_else(|panic| Err(LayoutError::Engine(panic_message(&*panic))));

        match outcome {
            Ok(html) => {
                if self.config.debug {
                    tracing::info!(
                        view,
                        extension = %self.config.extension,
                        data = %pretty(context),
                        "rendered view"
                    );
                }
                (StatusCode::OK, Html(html)).into_response()
            }
            Err(err) => {
                tracing::error!(
                    view,
                    extension = %self.config.extension,
                    error = %err,
                    data = %pretty(context),
                    "failed to render view"
                );
                fallback(self.config)
            }
        }
    }
}

/// Plain-text response carrying the configured render error
#[must_use]
pub fn fallback(config: &LayoutConfig) -> Response {
    (StatusCode::OK, config.render_error.clone()).into_response()
}

/// Indented JSON dump of a context, for logs
#[must_use]
pub fn pretty(context: &ViewData) -> String {
    serde_json::to_string_pretty(context).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not encode view data");
        format!("{context:?}")
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("template engine panicked: {detail}")
}
