//! minijinja backed template engine
//!
//! Templates are addressed without their extension (`home`,
//! `partials/header`, `layouts/index`) and resolved below the root directory.
//! A view is rendered first; the master layout is then rendered with the same
//! context plus the view output under [`CONTENT_KEY`].
//!
//! With caching enabled a single environment is kept for the engine's
//! lifetime and minijinja compiles each template once. With caching disabled
//! a fresh environment is built for every render so edits on disk show up
//! immediately.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use minijinja::syntax::SyntaxConfig;
use minijinja::{default_auto_escape_callback, Environment, Error, ErrorKind, Value};

use super::{FunctionSet, TemplateEngine};
use crate::config::{Delimiters, LayoutConfig};
use crate::data::ViewData;
use crate::error::LayoutError;

/// Layout context key holding the rendered view
pub const CONTENT_KEY: &str = "content";

/// Settings consumed by [`MiniJinjaEngine`]
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory of all templates
    pub root: PathBuf,
    /// Template file extension, with leading `.`
    pub extension: String,
    /// Master layout identifier, e.g. `layouts/index`
    pub master: String,
    /// Partial identifiers registered with the engine
    pub partials: Vec<String>,
    /// Reload templates on every render
    pub disable_cache: bool,
    /// Variable delimiters
    pub delimiters: Delimiters,
    /// Complete function table
    pub functions: FunctionSet,
}

impl EngineConfig {
    /// Derive engine settings from a layout configuration
    #[must_use]
    pub fn from_layout(config: &LayoutConfig, partials: Vec<String>, functions: FunctionSet) -> Self {
        Self {
            root: config.root.clone(),
            extension: config.extension.clone(),
            master: config.master(),
            partials,
            disable_cache: config.disable_cache,
            delimiters: config.delimiters.clone(),
            functions,
        }
    }
}

/// [`TemplateEngine`] implementation on top of minijinja
#[derive(Debug)]
pub struct MiniJinjaEngine {
    config: EngineConfig,
    cached: Option<Environment<'static>>,
}

impl MiniJinjaEngine {
    /// Create the engine
    ///
    /// When caching is enabled the partials are compiled up front. A partial
    /// that fails to compile is logged and left for the render that includes
    /// it to report. Delimiters minijinja cannot use are logged and replaced
    /// by the default syntax.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let cached = if config.disable_cache {
            None
        } else {
            let env = environment(&config);
            for partial in &config.partials {
                if let Err(err) = env.get_template(partial) {
                    tracing::warn!(partial = %partial, error = %err, "partial failed to compile");
                }
            }
            Some(env)
        };

        Self { config, cached }
    }

    /// Settings this engine was built with
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered partial identifiers
    #[must_use]
    pub fn partials(&self) -> &[String] {
        &self.config.partials
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, view: &str, context: &ViewData) -> Result<String, LayoutError> {
        if let Some(env) = &self.cached {
            return render_in_layout(env, &self.config.master, view, context);
        }

        let env = environment(&self.config);
        render_in_layout(&env, &self.config.master, view, context)
    }
}

fn environment(config: &EngineConfig) -> Environment<'static> {
    let mut env = Environment::new();

    let root = config.root.clone();
    let extension = config.extension.clone();
    env.set_loader(move |name| load_template(&root, &extension, name));

    let escape_name = format!("template{}", config.extension);
    env.set_auto_escape_callback(move |_| default_auto_escape_callback(&escape_name));

    let delimiters = config.delimiters.resolved();
    if !delimiters.is_default() {
        match syntax(&delimiters) {
            Ok(syntax) => env.set_syntax(syntax),
            Err(err) => tracing::warn!(
                left = %delimiters.left,
                right = %delimiters.right,
                error = %err,
                "unusable delimiters, keeping the default syntax"
            ),
        }
    }

    config.functions.register(&mut env);
    env
}

fn syntax(delimiters: &Delimiters) -> Result<SyntaxConfig, Error> {
    SyntaxConfig::builder()
        .variable_delimiters(delimiters.left.clone(), delimiters.right.clone())
        .build()
}

fn render_in_layout(
    env: &Environment<'static>,
    master: &str,
    view: &str,
    context: &ViewData,
) -> Result<String, LayoutError> {
    let content = env.get_template(view)?.render(context)?;

    let mut layout_context: BTreeMap<&str, Value> = context
        .iter()
        .map(|(key, value)| (key.as_str(), Value::from_serialize(value)))
        .collect();
    layout_context.insert(CONTENT_KEY, Value::from_safe_string(content));

    Ok(env.get_template(master)?.render(layout_context)?)
}

/// Resolve `name` to `<root>/<name><extension>`
///
/// Unknown templates resolve to `None`, which minijinja reports as
/// "template not found". Names escaping the root are treated as unknown.
fn load_template(root: &Path, extension: &str, name: &str) -> Result<Option<String>, Error> {
    let file = if name.ends_with(extension) {
        name.to_string()
    } else {
        format!("{name}{extension}")
    };

    let mut path = root.to_path_buf();
    for segment in file.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Ok(None);
        }
        path.push(segment);
    }

    match std::fs::read_to_string(&path) {
        Ok(source) => Ok(Some(source)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("could not read template '{}'", path.display()),
        )
        .with_source(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn site() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("layouts")).unwrap();
        fs::create_dir_all(root.path().join("partials")).unwrap();
        fs::write(
            root.path().join("layouts/index.html"),
            "<title>{{ app_name }}</title>{% include \"partials/header\" %}<main>{{ content }}</main>",
        )
        .unwrap();
        fs::write(root.path().join("partials/header.html"), "<header>{{ upper(app_name) }}</header>").unwrap();
        fs::write(root.path().join("home.html"), "<p>{{ hello }}</p>").unwrap();
        root
    }

    fn engine(root: &Path, disable_cache: bool) -> MiniJinjaEngine {
        let config = LayoutConfig::builder()
            .templates_path(root)
            .disable_cache(disable_cache)
            .build();
        let partials = vec!["partials/header".to_string()];
        MiniJinjaEngine::new(EngineConfig::from_layout(&config, partials, FunctionSet::baseline()))
    }

    fn context(value: serde_json::Value) -> ViewData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_view_is_wrapped_in_layout() {
        let root = site();
        let html = engine(root.path(), false)
            .render("home", &context(json!({ "app_name": "acton", "hello": "world" })))
            .unwrap();

        assert_eq!(
            html,
            "<title>acton</title><header>ACTON</header><main><p>world</p></main>"
        );
    }

    #[test]
    fn test_values_are_html_escaped() {
        let root = site();
        let html = engine(root.path(), false)
            .render("home", &context(json!({ "app_name": "a", "hello": "<b>" })))
            .unwrap();

        assert!(html.contains("<p>&lt;b&gt;</p>"));
    }

    #[test]
    fn test_missing_view_is_an_error() {
        let root = site();
        let err = engine(root.path(), false)
            .render("nope", &ViewData::new())
            .unwrap_err();

        assert!(matches!(err, LayoutError::Template(_)));
    }

    #[test]
    fn test_disabled_cache_sees_edits() {
        let root = site();
        let engine = engine(root.path(), true);
        let ctx = context(json!({ "app_name": "a", "hello": "x" }));

        assert!(engine.render("home", &ctx).unwrap().contains("<p>x</p>"));
        fs::write(root.path().join("home.html"), "<p>edited {{ hello }}</p>").unwrap();
        assert!(engine.render("home", &ctx).unwrap().contains("<p>edited x</p>"));
    }

    #[test]
    fn test_custom_delimiters() {
        let root = site();
        fs::write(root.path().join("layouts/index.html"), "[[ content ]]").unwrap();
        fs::write(root.path().join("home.html"), "{{ literal }} [[ hello ]]").unwrap();

        let config = LayoutConfig::builder()
            .templates_path(root.path())
            .delimiters("[[", "]]")
            .build();
        let engine = MiniJinjaEngine::new(EngineConfig::from_layout(&config, Vec::new(), FunctionSet::new()));

        let html = engine.render("home", &context(json!({ "hello": "hi" }))).unwrap();
        assert_eq!(html, "{{ literal }} hi");
    }

    #[test]
    fn test_empty_delimiters_use_default_syntax() {
        let root = site();
        let config = LayoutConfig::builder()
            .templates_path(root.path())
            .delimiters("", "")
            .build();
        let engine = MiniJinjaEngine::new(EngineConfig::from_layout(&config, Vec::new(), FunctionSet::baseline()));

        let html = engine
            .render("home", &context(json!({ "app_name": "a", "hello": "hi" })))
            .unwrap();
        assert!(html.contains("<p>hi</p>"));
    }

    #[test]
    fn test_rejected_delimiters_fall_back_to_default_syntax() {
        let root = site();
        let config = LayoutConfig::builder()
            .templates_path(root.path())
            .delimiters("{%", "%}")
            .build();
        assert!(syntax(&config.delimiters).is_err());

        let engine = MiniJinjaEngine::new(EngineConfig::from_layout(&config, Vec::new(), FunctionSet::baseline()));
        let html = engine
            .render("home", &context(json!({ "app_name": "a", "hello": "hi" })))
            .unwrap();
        assert!(html.contains("<p>hi</p>"));
    }

    #[test]
    fn test_loader_rejects_escaping_names() {
        let root = site();
        assert!(load_template(root.path(), ".html", "../secret").unwrap().is_none());
        assert!(load_template(root.path(), ".html", "home").unwrap().is_some());
        assert!(load_template(root.path(), ".html", "home.html").unwrap().is_some());
    }

    #[test]
    fn test_broken_partial_is_not_fatal() {
        let root = site();
        fs::write(root.path().join("partials/broken.html"), "{% if %}").unwrap();

        let config = LayoutConfig::builder().templates_path(root.path()).build();
        let partials = vec!["partials/header".to_string(), "partials/broken".to_string()];
        let engine = MiniJinjaEngine::new(EngineConfig::from_layout(&config, partials, FunctionSet::baseline()));

        assert_eq!(engine.partials().len(), 2);
        assert!(engine
            .render("home", &context(json!({ "app_name": "a", "hello": "x" })))
            .is_ok());
    }
}
