// src/routes/operators.rs

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::{query_as, query_scalar};

use crate::models::Operator;
use crate::AppState;

use super::{internal_error, not_found};

#[derive(Deserialize)]
pub struct ListOperatorsQ {
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct OperatorDetail {
    #[serde(flatten)]
    pub operator: Operator,
    pub department_ids: Vec<i64>,
}

pub async fn list_operators(
    State(state): State<AppState>,
    Query(q): Query<ListOperatorsQ>,
) -> Result<Json<Vec<Operator>>, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);

    let rows = if let Some(active) = q.active {
        query_as::<_, Operator>(
            r#"SELECT * FROM operators WHERE active = $1 ORDER BY id LIMIT $2 OFFSET $3"#,
        )
        .bind(active)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?
    } else {
        query_as::<_, Operator>(r#"SELECT * FROM operators ORDER BY id LIMIT $1 OFFSET $2"#)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await
            .map_err(internal_error)?
    };
    Ok(Json(rows))
}

pub async fn get_operator(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OperatorDetail>, (StatusCode, String)> {
    let operator = query_as::<_, Operator>(r#"SELECT * FROM operators WHERE id = $1"#)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Operator not found"))?;

    let department_ids: Vec<i64> = query_scalar(
        r#"SELECT department_id FROM operator_departments WHERE operator_id = $1 ORDER BY department_id"#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(OperatorDetail { operator, department_ids }))
}
