//! Template function table
//!
//! Every renderer exposes a fixed baseline library of helper functions to its
//! templates. Applications add their own through [`FunctionSet`]; on a name
//! collision the application's function replaces the baseline one.
//!
//! ```html
//! <h1>{{ title(page_name) }}</h1>
//! <p>{{ default("anonymous", user) }} - {{ date("%Y-%m-%d", created_at) }}</p>
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult};
use minijinja::{Environment, Error, ErrorKind, Value};

/// Named functions made available to every template as globals
#[derive(Debug, Clone, Default)]
pub struct FunctionSet {
    functions: BTreeMap<String, Value>,
}

impl FunctionSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The baseline library shipped with every renderer
    #[must_use]
    pub fn baseline() -> Self {
        Self::new()
            .with("upper", upper)
            .with("lower", lower)
            .with("title", title)
            .with("trim", trim)
            .with("trim_prefix", trim_prefix)
            .with("trim_suffix", trim_suffix)
            .with("has_prefix", has_prefix)
            .with("has_suffix", has_suffix)
            .with("contains", contains)
            .with("replace", replace)
            .with("repeat", repeat)
            .with("join", join)
            .with("default", default)
            .with("ternary", ternary)
            .with("to_json", to_json)
            .with("now", now)
            .with("date", date)
    }

    /// Add a function, builder style
    #[must_use]
    pub fn with<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.insert(name, f);
        self
    }

    /// Add a function, replacing any function with the same name
    pub fn insert<F, Rv, Args>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.insert_value(name, Value::from_function(f))
    }

    /// Add an already boxed function value
    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.functions.insert(name.into(), value);
        self
    }

    /// Return a new set with `overrides` layered on top of `self`
    #[must_use]
    pub fn overlay(&self, overrides: &Self) -> Self {
        let mut merged = self.clone();
        for (name, value) in &overrides.functions {
            merged.functions.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Look up a function by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.functions.get(name)
    }

    /// Whether a function with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Function names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Number of functions
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub(crate) fn register(&self, env: &mut Environment<'static>) {
        for (name, value) in &self.functions {
            env.add_global(name.clone(), value.clone());
        }
    }
}

fn upper(s: String) -> String {
    s.to_uppercase()
}

fn lower(s: String) -> String {
    s.to_lowercase()
}

fn title(s: String) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim(s: String) -> String {
    s.trim().to_string()
}

fn trim_prefix(prefix: String, s: String) -> String {
    s.strip_prefix(prefix.as_str()).map_or_else(|| s.clone(), str::to_string)
}

fn trim_suffix(suffix: String, s: String) -> String {
    s.strip_suffix(suffix.as_str()).map_or_else(|| s.clone(), str::to_string)
}

fn has_prefix(prefix: String, s: String) -> bool {
    s.starts_with(&prefix)
}

fn has_suffix(suffix: String, s: String) -> bool {
    s.ends_with(&suffix)
}

fn contains(needle: String, s: String) -> bool {
    s.contains(&needle)
}

fn replace(old: String, new: String, s: String) -> String {
    s.replace(&old, &new)
}

/// Upper bound on the output of `repeat`, in bytes
pub const MAX_REPEAT_LEN: usize = 1 << 20;

fn repeat(count: usize, s: String) -> Result<String, Error> {
    match count.checked_mul(s.len()) {
        Some(len) if len <= MAX_REPEAT_LEN => Ok(s.repeat(count)),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("repeat output would exceed {MAX_REPEAT_LEN} bytes"),
        )),
    }
}

fn join(separator: String, items: Vec<Value>) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&separator)
}

fn default(fallback: Value, given: Option<Value>) -> Value {
    match given {
        Some(value) if value.is_true() => value,
        _ => fallback,
    }
}

fn ternary(if_true: Value, if_false: Value, condition: bool) -> Value {
    if condition {
        if_true
    } else {
        if_false
    }
}

fn to_json(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value).map_err(|err| {
        Error::new(ErrorKind::InvalidOperation, "value cannot be encoded as json").with_source(err)
    })
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Format an RFC 3339 timestamp with a strftime pattern
fn date(format: String, timestamp: String) -> Result<String, Error> {
    let parsed = chrono::DateTime::parse_from_rfc3339(&timestamp).map_err(|err| {
        Error::new(ErrorKind::InvalidOperation, format!("invalid timestamp '{timestamp}'"))
            .with_source(err)
    })?;

    let mut out = String::new();
    write!(out, "{}", parsed.format(&format)).map_err(|_| {
        Error::new(ErrorKind::InvalidOperation, format!("invalid date format '{format}'"))
    })?;
    Ok(out)
}
