// src/routes/plan_targets.rs
//
// Writing and reading plan targets:
// - POST /plan-targets/set-month   month per_day and/or total for one subject
// - POST /plan-targets/set-day     pinpoint day/total target
// - GET  /plan-targets/by-subject  subject's rows for one month
// - GET  /plan-targets/effective/daily  resolved daily target + source

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{PeriodType, PlanMetric, PlanTarget, Subject, TargetMode, TargetSource};
use crate::plan::logic::month_first;
use crate::plan::repo;
use crate::AppState;

use super::{bad_request, internal_error, not_found, unprocessable};

#[derive(Deserialize)]
pub struct SetMonthBody {
    pub month: NaiveDate,
    pub metric: PlanMetric,
    pub department_id: Option<i64>,
    pub operator_id: Option<i64>,
    pub per_day: Option<i32>,
    pub total: Option<i32>,
    pub created_by: Option<i64>,
}

#[derive(Deserialize)]
pub struct SetDayBody {
    pub day: NaiveDate,
    pub metric: PlanMetric,
    pub department_id: Option<i64>,
    pub operator_id: Option<i64>,
    pub value: i32,
    pub created_by: Option<i64>,
}

#[derive(Deserialize)]
pub struct BySubjectQ {
    pub month: NaiveDate,
    pub department_id: Option<i64>,
    pub operator_id: Option<i64>,
    pub metric: Option<PlanMetric>,
}

#[derive(Serialize)]
pub struct ListOut {
    pub items: Vec<PlanTarget>,
    pub total: usize,
}

#[derive(Deserialize)]
pub struct EffectiveDailyQ {
    pub operator_id: i64,
    pub day: NaiveDate,
    pub metric: PlanMetric,
}

#[derive(Serialize)]
pub struct EffectiveDailyOut {
    pub operator_id: i64,
    pub date: NaiveDate,
    pub metric: PlanMetric,
    pub daily_target: Option<i32>,
    pub source: Option<TargetSource>,
}

/// 404 unless the subject row exists; targets must never point at a
/// missing operator/department.
async fn ensure_subject(state: &AppState, subject: Subject) -> Result<(), (StatusCode, String)> {
    let exists = repo::subject_exists(&state.pool, subject)
        .await
        .map_err(internal_error)?;
    if exists {
        Ok(())
    } else {
        let what = match subject {
            Subject::Operator(_) => "Operator not found",
            Subject::Department(_) => "Department not found",
        };
        Err(not_found(what))
    }
}

fn non_negative(name: &str, v: i32) -> Result<(), (StatusCode, String)> {
    if v < 0 {
        Err(unprocessable(format!("{name} must be >= 0")))
    } else {
        Ok(())
    }
}

/// POST /plan-targets/set-month
pub async fn set_month(
    State(state): State<AppState>,
    Json(b): Json<SetMonthBody>,
) -> Result<Json<Vec<PlanTarget>>, (StatusCode, String)> {
    let subject = Subject::from_ids(b.operator_id, b.department_id).map_err(unprocessable)?;
    if b.per_day.is_none() && b.total.is_none() {
        return Err(unprocessable("at least one of per_day or total must be set"));
    }
    if let Some(v) = b.per_day {
        non_negative("per_day", v)?;
    }
    if let Some(v) = b.total {
        non_negative("total", v)?;
    }
    ensure_subject(&state, subject).await?;

    let month1 = month_first(b.month);
    let mut rows = Vec::with_capacity(2);
    if let Some(v) = b.per_day {
        rows.push(
            repo::upsert_target(
                &state.pool,
                subject,
                b.metric,
                PeriodType::Month,
                TargetMode::PerDay,
                month1,
                v,
                b.created_by,
            )
            .await
            .map_err(internal_error)?,
        );
    }
    if let Some(v) = b.total {
        rows.push(
            repo::upsert_target(
                &state.pool,
                subject,
                b.metric,
                PeriodType::Month,
                TargetMode::Total,
                month1,
                v,
                b.created_by,
            )
            .await
            .map_err(internal_error)?,
        );
    }
    Ok(Json(rows))
}

/// POST /plan-targets/set-day
pub async fn set_day(
    State(state): State<AppState>,
    Json(b): Json<SetDayBody>,
) -> Result<Json<PlanTarget>, (StatusCode, String)> {
    let subject = Subject::from_ids(b.operator_id, b.department_id).map_err(unprocessable)?;
    non_negative("value", b.value)?;
    ensure_subject(&state, subject).await?;

    // day targets are always total: a single day has no per-day sub-unit
    let row = repo::upsert_target(
        &state.pool,
        subject,
        b.metric,
        PeriodType::Day,
        TargetMode::Total,
        b.day,
        b.value,
        b.created_by,
    )
    .await
    .map_err(internal_error)?;
    Ok(Json(row))
}

/// GET /plan-targets/by-subject
pub async fn by_subject(
    State(state): State<AppState>,
    Query(q): Query<BySubjectQ>,
) -> Result<Json<ListOut>, (StatusCode, String)> {
    let subject = Subject::from_ids(q.operator_id, q.department_id).map_err(bad_request)?;
    let month1 = month_first(q.month);
    let items = repo::list_by_subject(&state.pool, subject, month1, q.metric)
        .await
        .map_err(internal_error)?;
    let total = items.len();
    Ok(Json(ListOut { items, total }))
}

/// GET /plan-targets/effective/daily
pub async fn effective_daily(
    State(state): State<AppState>,
    Query(q): Query<EffectiveDailyQ>,
) -> Result<Json<EffectiveDailyOut>, (StatusCode, String)> {
    let (daily_target, source) = repo::effective_daily_value(&state.pool, q.operator_id, q.day, q.metric)
        .await
        .map_err(internal_error)?;
    Ok(Json(EffectiveDailyOut {
        operator_id: q.operator_id,
        date: q.day,
        metric: q.metric,
        daily_target,
        source,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Validation runs before any query, so a lazy pool never gets touched.
    fn test_state() -> AppState {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/aigor_test")
            .unwrap();
        AppState { pool }
    }

    fn aug(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, day).unwrap()
    }

    fn month_body() -> SetMonthBody {
        SetMonthBody {
            month: aug(1),
            metric: PlanMetric::IndicatorsDone,
            department_id: None,
            operator_id: Some(7),
            per_day: Some(10),
            total: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn set_month_rejects_double_subject_as_422() {
        let body = SetMonthBody { department_id: Some(3), ..month_body() };
        let (status, _) = set_month(State(test_state()), Json(body)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn set_month_rejects_missing_subject_as_422() {
        let body = SetMonthBody { operator_id: None, ..month_body() };
        let (status, _) = set_month(State(test_state()), Json(body)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn set_month_rejects_missing_per_day_and_total_as_422() {
        let body = SetMonthBody { per_day: None, total: None, ..month_body() };
        let (status, _) = set_month(State(test_state()), Json(body)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn set_month_rejects_negative_value_as_422() {
        let body = SetMonthBody { per_day: Some(-1), ..month_body() };
        let (status, _) = set_month(State(test_state()), Json(body)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    fn day_body() -> SetDayBody {
        SetDayBody {
            day: aug(15),
            metric: PlanMetric::StagesDone,
            department_id: None,
            operator_id: Some(7),
            value: 5,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn set_day_rejects_missing_subject_as_422() {
        let body = SetDayBody { operator_id: None, ..day_body() };
        let (status, _) = set_day(State(test_state()), Json(body)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn set_day_rejects_negative_value_as_422() {
        let body = SetDayBody { value: -5, ..day_body() };
        let (status, _) = set_day(State(test_state()), Json(body)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
