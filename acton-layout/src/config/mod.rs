//! Renderer configuration
//!
//! A [`LayoutConfig`] is resolved once per renderer and never changes
//! afterwards. It starts from hardcoded defaults, can optionally be seeded
//! from files and the environment, and is finished by applying an ordered
//! list of [`LayoutOption`]s where the last write to a field wins.
//!
//! Sources, lowest precedence first:
//!
//! 1. Hardcoded defaults
//! 2. `~/.config/acton-layout/{service_name}/layout.toml` (user config, XDG)
//! 3. `./layout.toml` (development)
//! 4. Environment variables (`ACTON_LAYOUT_` prefix, `__` for nesting)
//! 5. Options passed to [`LayoutConfigBuilder`]
//!
//! # Example Configuration
//!
//! ```toml
//! # layout.toml
//! root = "./templates"
//! layout = "app"
//! extension = ".html"
//! error_key = "errors"
//! error_mode = "list"
//! disable_cache = true
//!
//! [delimiters]
//! left = "[["
//! right = "]]"
//! ```
//!
//! # Usage
//!
//! ```rust
//! use acton_layout::config::LayoutConfig;
//!
//! let config = LayoutConfig::builder()
//!     .layout("app")
//!     .extension("tmpl")
//!     .disable_cache(true)
//!     .build();
//!
//! assert_eq!(config.extension, ".tmpl");
//! assert_eq!(config.master(), "layouts/app");
//! ```

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::template::FunctionSet;

/// How provider errors are stored under the error key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// A sequence of user-facing messages; internal failures are only logged
    #[default]
    List,
    /// One string joining every failure; internal failures show the default
    /// error message
    Single,
}

/// Template variable delimiters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    /// Opening delimiter
    pub left: String,
    /// Closing delimiter
    pub right: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            left: "{{".to_string(),
            right: "}}".to_string(),
        }
    }
}

impl Delimiters {
    /// Delimiters actually used, an empty side falls back to its default
    #[must_use]
    pub fn resolved(&self) -> Self {
        let default = Self::default();
        Self {
            left: if self.left.is_empty() { default.left } else { self.left.clone() },
            right: if self.right.is_empty() { default.right } else { self.right.clone() },
        }
    }

    /// Whether these are the stock `{{` and `}}` delimiters
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Effective renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Root directory containing all templates
    pub root: PathBuf,

    /// Partials directory, relative to `root`
    pub partials: String,

    /// Layouts directory, relative to `root`
    pub layouts: String,

    /// Name of the layout every view is wrapped in
    pub layout: String,

    /// Template file extension, always with a leading `.`
    pub extension: String,

    /// Variable delimiters
    pub delimiters: Delimiters,

    /// Context key holding provider errors
    pub error_key: String,

    /// Message shown in place of internal provider errors
    pub default_error_message: String,

    /// Plain text body sent when rendering fails
    pub render_error: String,

    /// Reload templates from disk on every render
    pub disable_cache: bool,

    /// Log the context of every successful render
    pub debug: bool,

    /// Error key layout
    pub error_mode: ErrorMode,

    /// Application template functions, layered over the baseline library
    #[serde(skip)]
    pub functions: FunctionSet,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("templates"),
            partials: "partials".to_string(),
            layouts: "layouts".to_string(),
            layout: "index".to_string(),
            extension: ".html".to_string(),
            delimiters: Delimiters::default(),
            error_key: "errors".to_string(),
            default_error_message: "Something went wrong while loading this page.".to_string(),
            render_error: "Something went wrong.".to_string(),
            disable_cache: false,
            debug: false,
            error_mode: ErrorMode::default(),
            functions: FunctionSet::new(),
        }
    }
}

impl LayoutConfig {
    /// Start a builder seeded with the defaults
    #[must_use]
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::new()
    }

    /// Template identifier of the master layout, e.g. `layouts/index`
    #[must_use]
    pub fn master(&self) -> String {
        format!("{}/{}", self.layouts, self.layout)
    }

    /// Directory scanned for partials
    #[must_use]
    pub fn partials_dir(&self) -> PathBuf {
        self.root.join(&self.partials)
    }

    /// Load configuration for a service from the XDG and local config files
    /// and the environment
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Config`] if a file cannot be parsed or a value
    /// has the wrong type.
    pub fn load_for_service(service_name: &str) -> Result<Self, LayoutError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let user_config = Self::recommended_path(service_name);
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        let local_config = PathBuf::from("./layout.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        Self::extract(figment)
    }

    /// Load configuration from a specific file, with environment overrides
    ///
    /// A missing file is not an error; the defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Config`] if the file cannot be parsed or a value
    /// has the wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, LayoutError> {
        let mut config: Self = figment
            .merge(Env::prefixed("ACTON_LAYOUT_").split("__").lowercase(true))
            .extract()?;
        config.extension = normalize_extension(&config.extension);
        Ok(config)
    }

    /// Recommended XDG config path for a service
    ///
    /// ```rust
    /// use acton_layout::config::LayoutConfig;
    ///
    /// let path = LayoutConfig::recommended_path("my-app");
    /// // Returns: ~/.config/acton-layout/my-app/layout.toml
    /// assert!(path.ends_with("layout.toml"));
    /// ```
    #[must_use]
    pub fn recommended_path(service_name: &str) -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./layout.toml"),
            |config_dir| {
                config_dir
                    .join("acton-layout")
                    .join(service_name)
                    .join("layout.toml")
            },
        )
    }
}

/// A single configuration override
#[derive(Debug, Clone)]
pub enum LayoutOption {
    /// Root templates directory
    TemplatesPath(PathBuf),
    /// Partials directory, relative to the root
    PartialsPath(String),
    /// Layouts directory, relative to the root
    LayoutsPath(String),
    /// Layout name
    Layout(String),
    /// File extension, with or without the leading `.`
    Extension(String),
    /// Variable delimiters
    Delimiters(Delimiters),
    /// Error context key
    ErrorKey(String),
    /// Message replacing internal provider errors
    DefaultErrorMessage(String),
    /// Render failure fallback body
    RenderError(String),
    /// Disable the template cache
    DisableCache(bool),
    /// Replace the application function set
    Functions(FunctionSet),
    /// Add one application function
    Function(String, Value),
    /// Debug logging of rendered contexts
    Debug(bool),
    /// Error key layout
    ErrorMode(ErrorMode),
}

impl LayoutOption {
    fn apply(self, config: &mut LayoutConfig) {
        match self {
            Self::TemplatesPath(root) => config.root = root,
            Self::PartialsPath(partials) => config.partials = partials,
            Self::LayoutsPath(layouts) => config.layouts = layouts,
            Self::Layout(layout) => config.layout = layout,
            Self::Extension(extension) => config.extension = normalize_extension(&extension),
            Self::Delimiters(delimiters) => config.delimiters = delimiters,
            Self::ErrorKey(key) => config.error_key = key,
            Self::DefaultErrorMessage(message) => config.default_error_message = message,
            Self::RenderError(message) => config.render_error = message,
            Self::DisableCache(disable) => config.disable_cache = disable,
            Self::Functions(functions) => config.functions = functions,
            Self::Function(name, value) => {
                config.functions.insert_value(name, value);
            }
            Self::Debug(debug) => config.debug = debug,
            Self::ErrorMode(mode) => config.error_mode = mode,
        }
    }
}

/// Applies [`LayoutOption`]s, in order, over a base configuration
#[derive(Debug, Clone, Default)]
pub struct LayoutConfigBuilder {
    base: LayoutConfig,
    options: Vec<LayoutOption>,
}

impl LayoutConfigBuilder {
    /// Builder over the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder over a loaded configuration
    #[must_use]
    pub fn from_config(base: LayoutConfig) -> Self {
        Self {
            base,
            options: Vec::new(),
        }
    }

    /// Queue an option
    #[must_use]
    pub fn option(mut self, option: LayoutOption) -> Self {
        self.options.push(option);
        self
    }

    /// Queue several options, keeping their order
    #[must_use]
    pub fn options(mut self, options: impl IntoIterator<Item = LayoutOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Root templates directory. Default `templates`
    #[must_use]
    pub fn templates_path(self, root: impl Into<PathBuf>) -> Self {
        self.option(LayoutOption::TemplatesPath(root.into()))
    }

    /// Partials directory inside the root. Default `partials`
    #[must_use]
    pub fn partials_path(self, partials: impl Into<String>) -> Self {
        self.option(LayoutOption::PartialsPath(partials.into()))
    }

    /// Layouts directory inside the root. Default `layouts`
    #[must_use]
    pub fn layouts_path(self, layouts: impl Into<String>) -> Self {
        self.option(LayoutOption::LayoutsPath(layouts.into()))
    }

    /// Layout every view is wrapped in. Default `index`
    #[must_use]
    pub fn layout(self, layout: impl Into<String>) -> Self {
        self.option(LayoutOption::Layout(layout.into()))
    }

    /// Template file extension. Default `.html`
    #[must_use]
    pub fn extension(self, extension: impl Into<String>) -> Self {
        self.option(LayoutOption::Extension(extension.into()))
    }

    /// Variable delimiters. Default `{{` and `}}`
    #[must_use]
    pub fn delimiters(self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.option(LayoutOption::Delimiters(Delimiters {
            left: left.into(),
            right: right.into(),
        }))
    }

    /// Context key for provider errors. Default `errors`
    #[must_use]
    pub fn error_key(self, key: impl Into<String>) -> Self {
        self.option(LayoutOption::ErrorKey(key.into()))
    }

    /// Message shown instead of internal errors in [`ErrorMode::Single`]
    #[must_use]
    pub fn default_error_message(self, message: impl Into<String>) -> Self {
        self.option(LayoutOption::DefaultErrorMessage(message.into()))
    }

    /// Body sent when rendering fails. Default `Something went wrong.`
    #[must_use]
    pub fn render_error(self, message: impl Into<String>) -> Self {
        self.option(LayoutOption::RenderError(message.into()))
    }

    /// Disable the template cache. Default `false`
    #[must_use]
    pub fn disable_cache(self, disable: bool) -> Self {
        self.option(LayoutOption::DisableCache(disable))
    }

    /// Replace the application function set
    #[must_use]
    pub fn functions(self, functions: FunctionSet) -> Self {
        self.option(LayoutOption::Functions(functions))
    }

    /// Add one application function
    #[must_use]
    pub fn function<F, Rv, Args>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.option(LayoutOption::Function(name.into(), Value::from_function(f)))
    }

    /// Log rendered contexts on success. Default `false`
    #[must_use]
    pub fn debug(self, debug: bool) -> Self {
        self.option(LayoutOption::Debug(debug))
    }

    /// Error key layout. Default [`ErrorMode::List`]
    #[must_use]
    pub fn error_mode(self, mode: ErrorMode) -> Self {
        self.option(LayoutOption::ErrorMode(mode))
    }

    /// Apply the queued options in order
    ///
    /// Values are taken as given: an empty delimiter falls back to the
    /// default when the engine is built, an empty extension means template
    /// files are named exactly like their identifiers.
    #[must_use]
    pub fn build(self) -> LayoutConfig {
        let mut config = self.base;
        for option in self.options {
            option.apply(&mut config);
        }
        config
    }
}

fn normalize_extension(extension: &str) -> String {
    if extension.is_empty() || extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}
