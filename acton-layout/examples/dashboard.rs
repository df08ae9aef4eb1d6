//! Two layouts over one template tree
//!
//! `/` renders `home` inside the `index` layout. `/app` renders `dashboard`
//! inside the `app` layout; its provider returns data together with an
//! error meant for the visitor.
//!
//! ```text
//! cargo run -p acton-layout --example dashboard
//! ```

use acton_layout::prelude::*;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

const TEMPLATES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/examples/templates");

fn layout(name: &str) -> Result<Renderer, LayoutError> {
    Renderer::builder()
        .config(
            LayoutConfig::builder()
                .templates_path(TEMPLATES)
                .layout(name)
                .disable_cache(true),
        )
        .default_data(StaticData::new(json!({ "app_name": "acton-layout" })))
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    acton_layout::observability::init()?;

    let index = layout("index")?;
    let app = layout("app")?;

    let home = provider(StaticData::new(json!({ "hello": "world" })));
    let dashboard = provider(from_fn(|_: &Parts| async {
        Data::from_value(json!({ "dashboard": "dashboard" })).with_error(DataError::user(
            "error in dashboard",
            "a wrapped error which is shown to the user",
        ))
    }));

    let router = Router::new()
        .route("/", get(index.view("home", vec![home])))
        .route("/app", get(app.view("dashboard", vec![dashboard])))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
