// src/routes/plan_eval.rs
//
// Plan-vs-actual evaluation:
// - GET /plan-targets/evaluate/daily    one day OR an inclusive date range
// - GET /plan-targets/evaluate/monthly  whole calendar month

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{EvalMetric, PlanStatus, TargetSource};
use crate::plan::logic::{classify, days_between, month_first, month_last, nonzero_target};
use crate::plan::repo;
use crate::AppState;

use super::{bad_request, internal_error};

#[derive(Deserialize)]
pub struct EvaluateDailyQ {
    pub operator_id: i64,
    pub metric: EvalMetric,
    pub day: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct EvaluateMonthlyQ {
    pub operator_id: i64,
    pub month: NaiveDate,
    pub metric: EvalMetric,
}

#[derive(Serialize)]
pub struct DayEvaluation {
    pub operator_id: i64,
    pub date: NaiveDate,
    pub metric: EvalMetric,
    pub actual: i64,
    pub target: Option<i32>,
    pub source: Option<TargetSource>,
    pub status: PlanStatus,
    pub ratio: Option<f64>,
}

#[derive(Serialize)]
pub struct PeriodEvaluation {
    pub operator_id: i64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub metric: EvalMetric,
    pub actual: i64,
    pub target: Option<i64>,
    pub status: PlanStatus,
    pub ratio: Option<f64>,
    pub days: usize,
    pub daily_breakdown: Vec<DayEvaluation>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum DailyEvaluationOut {
    Day(DayEvaluation),
    Period(PeriodEvaluation),
}

#[derive(Serialize)]
pub struct MonthlyEvaluation {
    pub operator_id: i64,
    pub month: NaiveDate,
    pub metric: EvalMetric,
    pub actual: i64,
    pub target: Option<i64>,
    pub source: Option<TargetSource>,
    pub status: PlanStatus,
    pub ratio: Option<f64>,
    pub days_in_month: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum EvalWindow {
    Day(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

/// The daily endpoint accepts a single day XOR an inclusive range.
fn eval_window(
    day: Option<NaiveDate>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> Result<EvalWindow, &'static str> {
    if day.is_some() && (date_from.is_some() || date_to.is_some()) {
        return Err("pass either day or date_from+date_to, not both");
    }
    if let Some(day) = day {
        return Ok(EvalWindow::Day(day));
    }
    let (Some(from), Some(to)) = (date_from, date_to) else {
        return Err("pass day, or both date_from and date_to");
    };
    if from > to {
        return Err("date_from must not be after date_to");
    }
    Ok(EvalWindow::Range(from, to))
}

async fn evaluate_one_day(
    state: &AppState,
    operator_id: i64,
    day: NaiveDate,
    metric: EvalMetric,
) -> Result<DayEvaluation, (StatusCode, String)> {
    let actual = repo::actual_for_range(&state.pool, operator_id, day, day, metric)
        .await
        .map_err(internal_error)?;
    let (target, source) =
        repo::effective_daily_value(&state.pool, operator_id, day, metric.as_plan_metric())
            .await
            .map_err(internal_error)?;
    let (status, ratio) = classify(metric, actual, target.map(i64::from));
    Ok(DayEvaluation {
        operator_id,
        date: day,
        metric,
        actual,
        target,
        source,
        status,
        ratio,
    })
}

/// GET /plan-targets/evaluate/daily
///
/// Pass `day` for a single day, or `date_from`+`date_to` for an inclusive
/// range with a per-day breakdown. The two shapes are mutually exclusive.
pub async fn evaluate_daily(
    State(state): State<AppState>,
    Query(q): Query<EvaluateDailyQ>,
) -> Result<Json<DailyEvaluationOut>, (StatusCode, String)> {
    let (date_from, date_to) = match eval_window(q.day, q.date_from, q.date_to).map_err(bad_request)? {
        EvalWindow::Day(day) => {
            let out = evaluate_one_day(&state, q.operator_id, day, q.metric).await?;
            return Ok(Json(DailyEvaluationOut::Day(out)));
        }
        EvalWindow::Range(from, to) => (from, to),
    };

    let days = days_between(date_from, date_to);
    let mut breakdown = Vec::with_capacity(days.len());
    let mut actual_total: i64 = 0;
    let mut target_total: i64 = 0;
    for day in days {
        let one = evaluate_one_day(&state, q.operator_id, day, q.metric).await?;
        actual_total += one.actual;
        if let Some(t) = one.target {
            target_total += i64::from(t);
        }
        breakdown.push(one);
    }

    // A range where no day had a configured target reports no_target instead
    // of pretending a 0 goal was met.
    let target_agg = nonzero_target(target_total);
    let (status, ratio) = classify(q.metric, actual_total, target_agg);
    Ok(Json(DailyEvaluationOut::Period(PeriodEvaluation {
        operator_id: q.operator_id,
        date_from,
        date_to,
        metric: q.metric,
        actual: actual_total,
        target: target_agg,
        status,
        ratio,
        days: breakdown.len(),
        daily_breakdown: breakdown,
    })))
}

/// GET /plan-targets/evaluate/monthly
///
/// Target precedence: operator month/total, then department month/total,
/// then the sum of per-day effective targets across the month (source stays
/// null in that fallback).
pub async fn evaluate_monthly(
    State(state): State<AppState>,
    Query(q): Query<EvaluateMonthlyQ>,
) -> Result<Json<MonthlyEvaluation>, (StatusCode, String)> {
    let month1 = month_first(q.month);
    let last_day = month_last(month1);
    let month_days = days_between(month1, last_day);

    let actual = repo::actual_for_range(&state.pool, q.operator_id, month1, last_day, q.metric)
        .await
        .map_err(internal_error)?;

    let month_total =
        repo::month_total_target(&state.pool, q.operator_id, month1, q.metric.as_plan_metric())
            .await
            .map_err(internal_error)?;

    let (target, source) = match month_total {
        Some((value, source)) => (Some(i64::from(value)), Some(source)),
        None => {
            let mut target_sum: i64 = 0;
            for day in &month_days {
                let (t, _) = repo::effective_daily_value(
                    &state.pool,
                    q.operator_id,
                    *day,
                    q.metric.as_plan_metric(),
                )
                .await
                .map_err(internal_error)?;
                if let Some(t) = t {
                    target_sum += i64::from(t);
                }
            }
            (nonzero_target(target_sum), None)
        }
    };

    let (status, ratio) = classify(q.metric, actual, target);
    Ok(Json(MonthlyEvaluation {
        operator_id: q.operator_id,
        month: month1,
        metric: q.metric,
        actual,
        target,
        source,
        status,
        ratio,
        days_in_month: month_days.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, day).unwrap()
    }

    #[test]
    fn window_single_day() {
        assert_eq!(eval_window(Some(d(15)), None, None), Ok(EvalWindow::Day(d(15))));
    }

    #[test]
    fn window_range() {
        assert_eq!(
            eval_window(None, Some(d(1)), Some(d(3))),
            Ok(EvalWindow::Range(d(1), d(3)))
        );
        assert_eq!(
            eval_window(None, Some(d(5)), Some(d(5))),
            Ok(EvalWindow::Range(d(5), d(5)))
        );
    }

    #[test]
    fn window_rejects_day_plus_range() {
        assert!(eval_window(Some(d(1)), Some(d(1)), None).is_err());
        assert!(eval_window(Some(d(1)), None, Some(d(2))).is_err());
    }

    #[test]
    fn window_rejects_incomplete_input() {
        assert!(eval_window(None, None, None).is_err());
        assert!(eval_window(None, Some(d(1)), None).is_err());
        assert!(eval_window(None, None, Some(d(2))).is_err());
    }

    #[test]
    fn window_rejects_inverted_range() {
        assert!(eval_window(None, Some(d(3)), Some(d(1))).is_err());
    }
}
