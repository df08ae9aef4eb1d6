//! View data providers
//!
//! A view is rendered from a [`ViewData`] map assembled per request by
//! running [`DataProvider`]s. Each provider sees the request metadata and
//! returns [`Data`]: some values, an error, or both. Values returned
//! alongside an error are still merged into the view.
//!
//! # Examples
//!
//! ```rust
//! use acton_layout::data::{from_fn, Data, StaticData};
//! use acton_layout::error::DataError;
//! use serde_json::json;
//!
//! let app = StaticData::new(json!({ "app_name": "acton" }));
//!
//! let dashboard = from_fn(|parts| {
//!     let path = parts.uri.path().to_string();
//!     async move {
//!         Data::from_value(json!({ "dashboard": path }))
//!             .with_error(DataError::user("error in dashboard", "a wrapped error shown to the user"))
//!     }
//! });
//! # let _ = (app, dashboard);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use http::request::Parts;
use serde::Serialize;

use crate::error::DataError;

pub mod pipeline;

pub use pipeline::{DataPipeline, ProviderLabel};

/// Context handed to the template engine
pub type ViewData = serde_json::Map<String, serde_json::Value>;

/// Shared, type-erased provider
pub type SharedProvider = Arc<dyn DataProvider>;

/// Output of a data provider
#[derive(Debug, Default)]
pub struct Data {
    /// Values merged into the view context
    pub values: ViewData,
    /// Failure reported by the provider, if any
    pub error: Option<DataError>,
}

impl Data {
    /// Values without an error
    #[must_use]
    pub const fn ok(values: ViewData) -> Self {
        Self {
            values,
            error: None,
        }
    }

    /// An error without values
    #[must_use]
    pub fn err(error: DataError) -> Self {
        Self {
            values: ViewData::new(),
            error: Some(error),
        }
    }

    /// Values from a JSON value; anything but an object yields no values
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(values) => Self::ok(values),
            _ => Self::default(),
        }
    }

    /// Values from any serializable type that encodes as a map
    ///
    /// # Errors
    ///
    /// Returns an internal [`DataError`] if the value cannot be encoded.
    pub fn serialize<T: Serialize>(value: &T) -> Result<Self, DataError> {
        let encoded = serde_json::to_value(value).map_err(anyhow::Error::from)?;
        Ok(Self::from_value(encoded))
    }

    /// Attach an error, keeping the values
    #[must_use]
    pub fn with_error(mut self, error: DataError) -> Self {
        self.error = Some(error);
        self
    }

    /// Insert a single value
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl From<Result<ViewData, DataError>> for Data {
    fn from(result: Result<ViewData, DataError>) -> Self {
        match result {
            Ok(values) => Self::ok(values),
            Err(error) => Self::err(error),
        }
    }
}

impl From<DataError> for Data {
    fn from(error: DataError) -> Self {
        Self::err(error)
    }
}

/// Produces view data for a request
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Produce values for the current request
    async fn provide(&self, parts: &Parts) -> Data;
}

/// Provider returning the same values for every request
#[derive(Debug, Clone)]
pub struct StaticData {
    values: ViewData,
}

impl StaticData {
    /// Wrap a JSON object; anything else yields an empty provider
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self {
            values: Data::from_value(value).values,
        }
    }

    /// Wrap an existing map
    #[must_use]
    pub const fn from_map(values: ViewData) -> Self {
        Self { values }
    }
}

#[async_trait]
impl DataProvider for StaticData {
    async fn provide(&self, _parts: &Parts) -> Data {
        Data::ok(self.values.clone())
    }
}

/// Provider backed by a closure, see [`from_fn`]
#[derive(Clone)]
pub struct FnProvider<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProvider").finish_non_exhaustive()
    }
}

/// Build a provider from a closure
///
/// The closure receives the request metadata and returns a future. Copy what
/// the future needs out of `parts` before the `async move` block.
pub fn from_fn<F, Fut, D>(f: F) -> FnProvider<F>
where
    F: Fn(&Parts) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = D> + Send + 'static,
    D: Into<Data> + 'static,
{
    FnProvider { f }
}

#[async_trait]
impl<F, Fut, D> DataProvider for FnProvider<F>
where
    F: Fn(&Parts) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = D> + Send + 'static,
    D: Into<Data> + 'static,
{
    async fn provide(&self, parts: &Parts) -> Data {
        (self.f)(parts).await.into()
    }
}
