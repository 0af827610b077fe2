// src/routes/calls.rs

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::query_as;

use crate::models::Call;
use crate::AppState;

use super::{bad_request, internal_error};

#[derive(Deserialize)]
pub struct ListCallsQ {
    pub operator_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /calls — soft-deleted rows are never returned.
pub async fn list_calls(
    State(state): State<AppState>,
    Query(q): Query<ListCallsQ>,
) -> Result<Json<Vec<Call>>, (StatusCode, String)> {
    if let (Some(from), Some(to)) = (q.date_from, q.date_to) {
        if from > to {
            return Err(bad_request("date_from must not be after date_to"));
        }
    }
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);

    let rows = query_as::<_, Call>(
        r#"
        SELECT * FROM calls
         WHERE deleted_at IS NULL
           AND ($1::bigint IS NULL OR operator_id = $1)
           AND ($2::date IS NULL OR call_start_date::date >= $2)
           AND ($3::date IS NULL OR call_start_date::date <= $3)
         ORDER BY call_start_date DESC, id DESC
         LIMIT $4 OFFSET $5
        "#,
    )
    .bind(q.operator_id)
    .bind(q.date_from)
    .bind(q.date_to)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}
