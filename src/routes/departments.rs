// src/routes/departments.rs

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::query_as;

use crate::models::{Department, Operator};
use crate::AppState;

use super::{internal_error, not_found};

pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Department>>, (StatusCode, String)> {
    let rows = query_as::<_, Department>(r#"SELECT * FROM departments ORDER BY id"#)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Department>, (StatusCode, String)> {
    query_as::<_, Department>(r#"SELECT * FROM departments WHERE id = $1"#)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Department not found"))
}

pub async fn list_department_operators(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Operator>>, (StatusCode, String)> {
    let rows = query_as::<_, Operator>(
        r#"
        SELECT o.* FROM operators o
          JOIN operator_departments od ON od.operator_id = o.id
         WHERE od.department_id = $1
         ORDER BY o.id
        "#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}
