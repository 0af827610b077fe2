// src/main.rs

use std::env;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::{Pool, Postgres};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod db;
mod models;
mod plan;
mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aigor_api=info,tower_http=info".into()),
        )
        .init();

    // DB pool + migrations
    let pool = db::connect().await?;
    let state = AppState { pool };

    // Very permissive CORS for local dev (tighten for prod)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // health
        .route("/health", get(routes::health::health))
        // plan targets: write + read
        .route("/plan-targets/set-month", post(routes::plan_targets::set_month))
        .route("/plan-targets/set-day", post(routes::plan_targets::set_day))
        .route("/plan-targets/by-subject", get(routes::plan_targets::by_subject))
        .route(
            "/plan-targets/effective/daily",
            get(routes::plan_targets::effective_daily),
        )
        // plan targets: evaluation
        .route(
            "/plan-targets/evaluate/daily",
            get(routes::plan_eval::evaluate_daily),
        )
        .route(
            "/plan-targets/evaluate/monthly",
            get(routes::plan_eval::evaluate_monthly),
        )
        // operators & departments (read-only collaborators)
        .route("/operators", get(routes::operators::list_operators))
        .route("/operators/:id", get(routes::operators::get_operator))
        .route("/departments", get(routes::departments::list_departments))
        .route("/departments/:id", get(routes::departments::get_department))
        .route(
            "/departments/:id/operators",
            get(routes::departments::list_department_operators),
        )
        // calls (read-only)
        .route("/calls", get(routes::calls::list_calls))
        // state & middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8006);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API listening");

    axum::serve(listener, api.into_make_service()).await?;
    Ok(())
}
