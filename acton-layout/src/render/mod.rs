//! Renderer factory and per-view handlers
//!
//! A [`Renderer`] is built once at startup: it resolves the configuration,
//! discovers the partials and constructs the template engine. Route handlers
//! are then derived from it with [`Renderer::view`]. Each request runs the
//! data providers, merges their output and renders the view; the client
//! always gets a response.
//!
//! # Examples
//!
//! ```rust,no_run
//! use acton_layout::prelude::*;
//! use axum::{routing::get, Router};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), LayoutError> {
//! let renderer = Renderer::builder()
//!     .config(LayoutConfig::builder().layout("index").disable_cache(true))
//!     .default_data(StaticData::new(json!({ "app_name": "acton" })))
//!     .build()?;
//!
//! let app: Router = Router::new().route(
//!     "/",
//!     get(renderer.view("home", vec![provider(StaticData::new(json!({ "hello": "world" })))])),
//! );
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::handler::Handler;
use axum::response::Response;
use http::request::Parts;

use crate::config::{LayoutConfig, LayoutConfigBuilder, LayoutOption};
use crate::data::{DataPipeline, DataProvider, SharedProvider, ViewData};
use crate::error::LayoutError;
use crate::template::{discover_partials, EngineConfig, FunctionSet, MiniJinjaEngine, TemplateEngine};

mod invoker;

pub use invoker::{fallback, pretty, RenderInvoker};

/// Box a provider for use in a provider list
pub fn provider(provider: impl DataProvider + 'static) -> SharedProvider {
    Arc::new(provider)
}

struct RendererInner {
    config: LayoutConfig,
    partials: Vec<String>,
    engine: Box<dyn TemplateEngine>,
    default_data: Option<SharedProvider>,
}

/// Bound render capability shared by all handlers of one layout
#[derive(Clone)]
pub struct Renderer {
    inner: Arc<RendererInner>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.inner.config)
            .field("partials", &self.inner.partials)
            .field("default_data", &self.inner.default_data.is_some())
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Start building a renderer
    #[must_use]
    pub fn builder() -> RendererBuilder {
        RendererBuilder::new()
    }

    /// Build a renderer from a resolved configuration, without default data
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::PartialDiscovery`] if the partials directory
    /// cannot be listed.
    pub fn new(config: LayoutConfig) -> Result<Self, LayoutError> {
        Self::builder()
            .config(LayoutConfigBuilder::from_config(config))
            .build()
    }

    /// Assemble a renderer around an existing engine
    pub fn with_engine(
        config: LayoutConfig,
        partials: Vec<String>,
        engine: impl TemplateEngine + 'static,
        default_data: Option<SharedProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(RendererInner {
                config,
                partials,
                engine: Box::new(engine),
                default_data,
            }),
        }
    }

    /// Effective configuration
    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.inner.config
    }

    /// Partials registered with the engine, in discovery order
    #[must_use]
    pub fn partials(&self) -> &[String] {
        &self.inner.partials
    }

    /// Handler rendering `view` with the default provider and `providers`
    #[must_use]
    pub fn view(&self, view: impl Into<String>, providers: Vec<SharedProvider>) -> ViewHandler {
        let view: String = view.into();
        ViewHandler {
            renderer: self.clone(),
            view: view.into(),
            providers: providers.into(),
        }
    }

    /// Run the providers for `parts` and render `view`
    ///
    /// With the cache disabled every render reads its templates from disk, so
    /// it runs on tokio's blocking pool instead of the async worker.
    pub async fn render(&self, view: &str, parts: &Parts, providers: &[SharedProvider]) -> Response {
        let inner = &*self.inner;
        let context = DataPipeline::new(&inner.config)
            .run(view, parts, inner.default_data.as_deref(), providers)
            .await;

        if !inner.config.disable_cache {
            return self.invoke(view, &context);
        }

        let renderer = self.clone();
        let owned_view = view.to_string();
        match tokio::task::spawn_blocking(move || renderer.invoke(&owned_view, &context)).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(view, error = %err, "render task failed");
                fallback(&inner.config)
            }
        }
    }

    fn invoke(&self, view: &str, context: &ViewData) -> Response {
        RenderInvoker::new(self.inner.engine.as_ref(), &self.inner.config).invoke(view, context)
    }
}

/// Configures and builds a [`Renderer`]
#[derive(Default)]
pub struct RendererBuilder {
    config: LayoutConfigBuilder,
    default_data: Option<SharedProvider>,
}

impl fmt::Debug for RendererBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererBuilder")
            .field("config", &self.config)
            .field("default_data", &self.default_data.is_some())
            .finish()
    }
}

impl RendererBuilder {
    /// Builder over the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration builder
    #[must_use]
    pub fn config(mut self, config: LayoutConfigBuilder) -> Self {
        self.config = config;
        self
    }

    /// Queue a configuration option
    #[must_use]
    pub fn option(mut self, option: LayoutOption) -> Self {
        self.config = self.config.option(option);
        self
    }

    /// Queue several configuration options
    #[must_use]
    pub fn options(mut self, options: impl IntoIterator<Item = LayoutOption>) -> Self {
        self.config = self.config.options(options);
        self
    }

    /// Provider run before the view providers of every request
    #[must_use]
    pub fn default_data(mut self, provider: impl DataProvider + 'static) -> Self {
        self.default_data = Some(Arc::new(provider));
        self
    }

    /// Resolve the configuration, discover partials and build the engine
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::PartialDiscovery`] if the partials directory
    /// cannot be listed. Nothing else fails construction.
    pub fn build(self) -> Result<Renderer, LayoutError> {
        let config = self.config.build();
        let partials = discover_partials(&config.root, &config.partials, &config.extension)?;
        let functions = FunctionSet::baseline().overlay(&config.functions);

        let engine = MiniJinjaEngine::new(EngineConfig::from_layout(&config, partials.clone(), functions));

        tracing::debug!(
            root = %config.root.display(),
            master = %config.master(),
            partials = partials.len(),
            cache = !config.disable_cache,
            "layout renderer ready"
        );

        Ok(Renderer::with_engine(config, partials, engine, self.default_data))
    }
}

/// axum handler rendering one view
#[derive(Clone)]
pub struct ViewHandler {
    renderer: Renderer,
    view: Arc<str>,
    providers: Arc<[SharedProvider]>,
}

impl fmt::Debug for ViewHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewHandler")
            .field("view", &self.view)
            .field("providers", &self.providers.len())
            .finish_non_exhaustive()
    }
}

impl ViewHandler {
    /// View rendered by this handler
    #[must_use]
    pub fn view(&self) -> &str {
        &self.view
    }

    /// Render for a request
    pub async fn handle(&self, parts: &Parts) -> Response {
        self.renderer.render(&self.view, parts, &self.providers).await
    }
}

impl<S> Handler<(), S> for ViewHandler
where
    S: Send + Sync + 'static,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, req: Request, _state: S) -> Self::Future {
        Box::pin(async move {
            let (parts, _body) = req.into_parts();
            self.handle(&parts).await
        })
    }
}
