//! Merge of provider outputs into one view context
//!
//! Providers run one after another: the renderer's default provider first,
//! then the view's providers in the order they were given. A failing provider
//! never stops the ones after it. Later values overwrite earlier values with
//! the same key, and the collected error entry is written last so it always
//! wins over a data key of the same name.
//!
//! What lands under the error key depends on [`ErrorMode`]:
//!
//! | mode     | user-facing error | internal error          | stored as        |
//! |----------|-------------------|-------------------------|------------------|
//! | `List`   | its message       | nothing (logged only)   | array of strings |
//! | `Single` | its message       | default error message   | one joined string |

use std::fmt;

use http::request::Parts;
use serde_json::Value;

use super::{Data, DataProvider, SharedProvider, ViewData};
use crate::config::{ErrorMode, LayoutConfig};
use crate::error::{classify, Classified};

/// Separator between messages in [`ErrorMode::Single`]
pub const SINGLE_ERROR_SEPARATOR: &str = "; ";

/// Which provider produced an output, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderLabel {
    /// The renderer-wide default provider
    Default,
    /// The n-th provider passed to a view
    View(usize),
}

impl fmt::Display for ProviderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::View(index) => write!(f, "view[{index}]"),
        }
    }
}

/// Runs providers and merges their output for one request
#[derive(Debug, Clone, Copy)]
pub struct DataPipeline<'a> {
    config: &'a LayoutConfig,
}

impl<'a> DataPipeline<'a> {
    /// Pipeline using the error settings of `config`
    #[must_use]
    pub const fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// Run the default provider, then `providers` in order, and merge
    pub async fn run(
        &self,
        view: &str,
        parts: &Parts,
        default: Option<&dyn DataProvider>,
        providers: &[SharedProvider],
    ) -> ViewData {
        let mut outputs = Vec::with_capacity(providers.len() + 1);
        if let Some(provider) = default {
            outputs.push((ProviderLabel::Default, provider.provide(parts).await));
        }
        for (index, provider) in providers.iter().enumerate() {
            outputs.push((ProviderLabel::View(index), provider.provide(parts).await));
        }
        self.merge(view, outputs)
    }

    /// Merge already produced outputs, in iteration order
    pub fn merge(
        &self,
        view: &str,
        outputs: impl IntoIterator<Item = (ProviderLabel, Data)>,
    ) -> ViewData {
        let mut view_data = ViewData::new();
        let mut messages = Vec::new();

        for (label, data) in outputs {
            if let Some(error) = &data.error {
                match classify(error) {
                    Classified::UserFacing(message) => {
                        tracing::info!(view, provider = %label, error = %error, "data provider reported a user error");
                        messages.push(message);
                    }
                    Classified::Internal(cause) => {
                        tracing::error!(view, provider = %label, error = %cause, "data provider failed internally");
                        if self.config.error_mode == ErrorMode::Single {
                            messages.push(self.config.default_error_message.clone());
                        }
                    }
                }
            }
            view_data.extend(data.values);
        }

        if !messages.is_empty() {
            let entry = match self.config.error_mode {
                ErrorMode::List => Value::Array(messages.into_iter().map(Value::String).collect()),
                ErrorMode::Single => Value::String(messages.join(SINGLE_ERROR_SEPARATOR)),
            };
            view_data.insert(self.config.error_key.clone(), entry);
        }

        view_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StaticData;
    use crate::error::DataError;
    use crate::testing::{capture, events_named};
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tracing::Level;

    fn config(mode: ErrorMode) -> LayoutConfig {
        LayoutConfig::builder().error_mode(mode).build()
    }

    fn parts() -> Parts {
        http::Request::builder().uri("/").body(()).unwrap().into_parts().0
    }

    fn view(outputs: Vec<Data>) -> Vec<(ProviderLabel, Data)> {
        outputs
            .into_iter()
            .enumerate()
            .map(|(i, data)| (ProviderLabel::View(i), data))
            .collect()
    }

    #[test]
    fn test_single_provider_round_trip() {
        let config = config(ErrorMode::List);
        let merged = DataPipeline::new(&config).merge("home", view(vec![Data::from_value(json!({ "x": 1 }))]));

        assert_eq!(merged["x"], 1);
        assert!(!merged.contains_key("errors"));
    }

    #[test]
    fn test_later_providers_overwrite() {
        let config = config(ErrorMode::List);
        let merged = DataPipeline::new(&config).merge(
            "home",
            [
                (ProviderLabel::Default, Data::from_value(json!({ "title": "default", "app": "acton" }))),
                (ProviderLabel::View(0), Data::from_value(json!({ "title": "view" }))),
            ],
        );

        assert_eq!(merged["title"], "view");
        assert_eq!(merged["app"], "acton");
    }

    #[test]
    fn test_list_mode_collects_only_user_errors() {
        let config = config(ErrorMode::List);
        let merged = DataPipeline::new(&config).merge(
            "dashboard",
            view(vec![
                Data::err(DataError::user("loading", "FIRST problem")),
                Data::err(DataError::internal("db timeout")),
                Data::from_value(json!({ "dashboard": "dashboard" }))
                    .with_error(DataError::user("loading", "second problem")),
            ]),
        );

        assert_eq!(merged["errors"], json!(["First problem", "Second problem"]));
        assert_eq!(merged["dashboard"], "dashboard");
        assert!(!serde_json::to_string(&merged).unwrap().contains("db timeout"));
    }

    #[test]
    fn test_list_mode_internal_only_leaves_no_error_key() {
        let config = config(ErrorMode::List);
        let merged = DataPipeline::new(&config)
            .merge("home", view(vec![Data::err(DataError::internal("secret failure"))]));

        assert!(!merged.contains_key("errors"));
    }

    #[test]
    fn test_single_mode_uses_default_message_for_internal() {
        let config = LayoutConfig::builder()
            .error_mode(ErrorMode::Single)
            .error_key("error")
            .default_error_message("Please try again.")
            .build();
        let merged = DataPipeline::new(&config).merge(
            "home",
            [
                (ProviderLabel::Default, Data::err(DataError::internal("secret failure"))),
                (ProviderLabel::View(0), Data::err(DataError::user("ctx", "bad input"))),
            ],
        );

        assert_eq!(merged["error"], "Please try again.; Bad input");
    }

    #[test]
    fn test_single_mode_one_error_is_not_joined() {
        let config = config(ErrorMode::Single);
        let merged = DataPipeline::new(&config)
            .merge("home", view(vec![Data::err(DataError::user("ctx", "only one"))]));

        assert_eq!(merged["errors"], "Only one");
    }

    #[test]
    fn test_error_entry_wins_over_colliding_data_key() {
        let config = config(ErrorMode::List);
        let merged = DataPipeline::new(&config).merge(
            "home",
            view(vec![
                Data::err(DataError::user("ctx", "shown")),
                Data::from_value(json!({ "errors": "data value" })),
            ]),
        );

        assert_eq!(merged["errors"], json!(["Shown"]));
    }

    #[test]
    fn test_single_mode_error_entry_wins_over_colliding_data_key() {
        let config = config(ErrorMode::Single);
        let merged = DataPipeline::new(&config).merge(
            "home",
            view(vec![
                Data::err(DataError::internal("hidden")),
                Data::from_value(json!({ "errors": ["data", "value"] })),
            ]),
        );

        assert_eq!(merged["errors"], "Something went wrong while loading this page.");
    }

    #[test]
    fn test_provider_failures_are_logged_by_kind() {
        let config = config(ErrorMode::List);
        let (_, events) = capture(|| {
            DataPipeline::new(&config).merge(
                "dashboard",
                [
                    (ProviderLabel::Default, Data::err(DataError::internal("db timeout"))),
                    (
                        ProviderLabel::View(0),
                        Data::err(DataError::user("error in dashboard", "a wrapped message")),
                    ),
                    (ProviderLabel::View(1), Data::from_value(json!({ "fine": true }))),
                ],
            )
        });

        let internal = events_named(&events, "data provider failed internally");
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].level, Level::ERROR);
        assert_eq!(internal[0].field("provider"), Some("default"));
        assert_eq!(internal[0].field("view"), Some("dashboard"));
        assert_eq!(internal[0].field("error"), Some("db timeout"));

        let user = events_named(&events, "data provider reported a user error");
        assert_eq!(user.len(), 1);
        assert_eq!(user[0].level, Level::INFO);
        assert_eq!(user[0].field("provider"), Some("view[0]"));
        assert_eq!(user[0].field("error"), Some("error in dashboard: a wrapped message"));
    }

    #[test]
    fn test_clean_merge_logs_nothing() {
        let config = config(ErrorMode::List);
        let (_, events) = capture(|| {
            DataPipeline::new(&config).merge("home", view(vec![Data::from_value(json!({ "x": 1 }))]))
        });

        assert!(events.is_empty());
    }

    #[test]
    fn test_colliding_data_key_survives_without_errors() {
        let config = config(ErrorMode::List);
        let merged = DataPipeline::new(&config)
            .merge("home", view(vec![Data::from_value(json!({ "errors": "data value" }))]));

        assert_eq!(merged["errors"], "data value");
    }

    #[tokio::test]
    async fn test_run_orders_default_first() {
        let config = config(ErrorMode::List);
        let default = StaticData::new(json!({ "title": "default", "layout_only": true }));
        let providers: Vec<SharedProvider> = vec![
            Arc::new(StaticData::new(json!({ "title": "first" }))),
            Arc::new(crate::data::from_fn(|_: &Parts| async {
                Data::err(DataError::user("ctx", "failed"))
            })),
            Arc::new(StaticData::new(json!({ "title": "last" }))),
        ];

        let merged = DataPipeline::new(&config)
            .run("home", &parts(), Some(&default as &dyn DataProvider), &providers)
            .await;

        assert_eq!(merged["title"], "last");
        assert_eq!(merged["layout_only"], true);
        assert_eq!(merged["errors"], json!(["Failed"]));
    }

    #[tokio::test]
    async fn test_run_without_providers_is_empty() {
        let config = config(ErrorMode::List);
        let merged = DataPipeline::new(&config).run("home", &parts(), None, &[]).await;
        assert!(merged.is_empty());
    }

    #[derive(Debug, Clone)]
    enum Outcome {
        Clean,
        User(String),
        Internal,
    }

    fn outcome() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            Just(Outcome::Clean),
            "[a-z]{1,6}".prop_map(Outcome::User),
            Just(Outcome::Internal),
        ]
    }

    fn provider_output() -> impl Strategy<Value = (Vec<(String, i64)>, Outcome)> {
        (
            prop::collection::vec(("[a-d]", any::<i64>()), 0..4),
            outcome(),
        )
    }

    proptest! {
        #[test]
        fn prop_last_writer_wins_and_user_errors_are_counted(
            outputs in prop::collection::vec(provider_output(), 0..8)
        ) {
            let config = config(ErrorMode::List);
            let mut expected = HashMap::new();
            let mut user_errors = 0;

            let data: Vec<Data> = outputs
                .iter()
                .map(|(pairs, outcome)| {
                    let mut data = Data::default();
                    for (key, value) in pairs {
                        expected.insert(key.clone(), *value);
                        data = data.with(key.clone(), *value);
                    }
                    match outcome {
                        Outcome::Clean => data,
                        Outcome::User(message) => {
                            user_errors += 1;
                            data.with_error(DataError::user("ctx", message.clone()))
                        }
                        Outcome::Internal => data.with_error(DataError::internal("hidden")),
                    }
                })
                .collect();

            let merged = DataPipeline::new(&config).merge("prop", view(data));

            for (key, value) in &expected {
                prop_assert_eq!(&merged[key.as_str()], &json!(value));
            }
            match merged.get("errors") {
                Some(Value::Array(errors)) => prop_assert_eq!(errors.len(), user_errors),
                Some(other) => prop_assert!(false, "unexpected error entry {other}"),
                None => prop_assert_eq!(user_errors, 0),
            }
        }
    }
}
