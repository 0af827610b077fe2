// src/plan/repo.rs
//
// All plan_targets SQL lives here: subject checks, the natural-key upsert,
// the layered target resolver and the actuals aggregator.

use chrono::NaiveDate;
use sqlx::{query_scalar, Pool, Postgres};

use crate::models::{EvalMetric, PeriodType, PlanMetric, PlanTarget, Subject, TargetMode, TargetSource};
use crate::plan::logic::month_first;

/// True when the referenced operator or department exists.
pub async fn subject_exists(pool: &Pool<Postgres>, subject: Subject) -> sqlx::Result<bool> {
    let found: Option<i64> = match subject {
        Subject::Operator(id) => {
            query_scalar(r#"SELECT id FROM operators WHERE id=$1"#)
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        Subject::Department(id) => {
            query_scalar(r#"SELECT id FROM departments WHERE id=$1"#)
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
    };
    Ok(found.is_some())
}

/// Upsert one target row against its natural key
/// (subject, metric, period_type, target_mode, period_date).
///
/// The unique constraint plus ON CONFLICT makes the write atomic, so two
/// concurrent writers on the same key never create a duplicate row; last
/// write wins on the value. created_at/created_by survive updates,
/// updated_at is refreshed.
pub async fn upsert_target(
    pool: &Pool<Postgres>,
    subject: Subject,
    metric: PlanMetric,
    period_type: PeriodType,
    target_mode: TargetMode,
    period_date: NaiveDate,
    value: i32,
    created_by: Option<i64>,
) -> sqlx::Result<PlanTarget> {
    sqlx::query_as::<_, PlanTarget>(
        r#"
        INSERT INTO plan_targets
            (period_type, target_mode, metric, period_date, target_value,
             department_id, operator_id, created_by)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT ON CONSTRAINT plan_targets_natural_key
        DO UPDATE SET target_value = EXCLUDED.target_value,
                      updated_at = now()
        RETURNING id, period_type, target_mode, metric, period_date, target_value,
                  department_id, operator_id, created_by, created_at, updated_at
        "#,
    )
    .bind(period_type)
    .bind(target_mode)
    .bind(metric)
    .bind(period_date)
    .bind(value)
    .bind(subject.department_id())
    .bind(subject.operator_id())
    .bind(created_by)
    .fetch_one(pool)
    .await
}

/// Targets of one subject for one month, optionally narrowed to a metric.
/// Ordered by metric then target_mode for a stable listing.
pub async fn list_by_subject(
    pool: &Pool<Postgres>,
    subject: Subject,
    month1: NaiveDate,
    metric: Option<PlanMetric>,
) -> sqlx::Result<Vec<PlanTarget>> {
    sqlx::query_as::<_, PlanTarget>(
        r#"
        SELECT id, period_type, target_mode, metric, period_date, target_value,
               department_id, operator_id, created_by, created_at, updated_at
          FROM plan_targets
         WHERE period_type = 'month'
           AND period_date = $1
           AND operator_id IS NOT DISTINCT FROM $2
           AND department_id IS NOT DISTINCT FROM $3
           AND ($4::plan_metric IS NULL OR metric = $4)
         ORDER BY metric ASC, target_mode ASC
        "#,
    )
    .bind(month1)
    .bind(subject.operator_id())
    .bind(subject.department_id())
    .bind(metric)
    .fetch_all(pool)
    .await
}

/// Which side of the membership walk a resolver probe looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbeScope {
    Operator,
    Department,
}

/// Candidate-target lookup the resolver walks. The Postgres pool is the real
/// implementation; tests drive the chain with an in-memory table.
pub(crate) trait TargetProbes {
    async fn target_value(
        &self,
        scope: ProbeScope,
        operator_id: i64,
        period_type: PeriodType,
        target_mode: TargetMode,
        period_date: NaiveDate,
        metric: PlanMetric,
    ) -> sqlx::Result<Option<i32>>;
}

impl TargetProbes for Pool<Postgres> {
    async fn target_value(
        &self,
        scope: ProbeScope,
        operator_id: i64,
        period_type: PeriodType,
        target_mode: TargetMode,
        period_date: NaiveDate,
        metric: PlanMetric,
    ) -> sqlx::Result<Option<i32>> {
        let sql = match scope {
            ProbeScope::Operator => {
                r#"
                SELECT target_value FROM plan_targets
                 WHERE operator_id = $1 AND department_id IS NULL
                   AND period_type = $2 AND target_mode = $3
                   AND metric = $4 AND period_date = $5
                 LIMIT 1
                "#
            }
            // most recently created department row wins; id breaks timestamp ties
            ProbeScope::Department => {
                r#"
                SELECT pt.target_value
                  FROM operator_departments od
                  JOIN plan_targets pt
                    ON pt.department_id = od.department_id
                   AND pt.operator_id IS NULL
                   AND pt.period_type = $2 AND pt.target_mode = $3
                   AND pt.metric = $4 AND pt.period_date = $5
                 WHERE od.operator_id = $1
                 ORDER BY pt.created_at DESC, pt.id DESC
                 LIMIT 1
                "#
            }
        };
        query_scalar::<_, i32>(sql)
            .bind(operator_id)
            .bind(period_type)
            .bind(target_mode)
            .bind(metric)
            .bind(period_date)
            .fetch_optional(self)
            .await
    }
}

/// Walks the four candidate sources in strict priority order and returns the
/// first hit:
/// 1. operator day/total for the exact day
/// 2. operator month/per_day for the day's month
/// 3. department day/total across the operator's departments
/// 4. department month/per_day across the operator's departments
///
/// No match at all is not an error: (None, None) means "no target
/// configured".
pub(crate) async fn resolve_daily<P: TargetProbes>(
    probes: &P,
    operator_id: i64,
    day: NaiveDate,
    metric: PlanMetric,
) -> sqlx::Result<(Option<i32>, Option<TargetSource>)> {
    let month1 = month_first(day);
    let chain = [
        (ProbeScope::Operator, PeriodType::Day, TargetMode::Total, day, TargetSource::OperatorDay),
        (
            ProbeScope::Operator,
            PeriodType::Month,
            TargetMode::PerDay,
            month1,
            TargetSource::OperatorMonthPerDay,
        ),
        (ProbeScope::Department, PeriodType::Day, TargetMode::Total, day, TargetSource::DeptDay),
        (
            ProbeScope::Department,
            PeriodType::Month,
            TargetMode::PerDay,
            month1,
            TargetSource::DeptMonthPerDay,
        ),
    ];
    for (scope, period_type, target_mode, date, source) in chain {
        if let Some(v) = probes
            .target_value(scope, operator_id, period_type, target_mode, date, metric)
            .await?
        {
            return Ok((Some(v), Some(source)));
        }
    }
    Ok((None, None))
}

/// Effective daily target for one operator/date/metric.
pub async fn effective_daily_value(
    pool: &Pool<Postgres>,
    operator_id: i64,
    day: NaiveDate,
    metric: PlanMetric,
) -> sqlx::Result<(Option<i32>, Option<TargetSource>)> {
    resolve_daily(pool, operator_id, day, metric).await
}

/// Month/total target for one operator's month: operator-level first, then
/// the freshest department-level row. None means the monthly evaluation
/// falls back to summing per-day effective targets.
pub async fn month_total_target(
    pool: &Pool<Postgres>,
    operator_id: i64,
    month1: NaiveDate,
    metric: PlanMetric,
) -> sqlx::Result<Option<(i32, TargetSource)>> {
    let op: Option<i32> = query_scalar(
        r#"
        SELECT target_value FROM plan_targets
         WHERE operator_id = $1 AND department_id IS NULL
           AND period_type = 'month' AND target_mode = 'total'
           AND metric = $2 AND period_date = $3
         LIMIT 1
        "#,
    )
    .bind(operator_id)
    .bind(metric)
    .bind(month1)
    .fetch_optional(pool)
    .await?;
    if let Some(v) = op {
        return Ok(Some((v, TargetSource::OperatorMonthTotal)));
    }

    let dept: Option<i32> = query_scalar(
        r#"
        SELECT pt.target_value
          FROM operator_departments od
          JOIN plan_targets pt
            ON pt.department_id = od.department_id
           AND pt.operator_id IS NULL
           AND pt.period_type = 'month' AND pt.target_mode = 'total'
           AND pt.metric = $2 AND pt.period_date = $3
         WHERE od.operator_id = $1
         ORDER BY pt.created_at DESC, pt.id DESC
         LIMIT 1
        "#,
    )
    .bind(operator_id)
    .bind(metric)
    .bind(month1)
    .fetch_optional(pool)
    .await?;

    Ok(dept.map(|v| (v, TargetSource::DeptMonthTotal)))
}

/// Sum of one per-call counter over the operator's non-deleted calls whose
/// start date falls in [date_from, date_to]. Missing counters count as 0;
/// an empty range sums to 0, never null.
pub async fn actual_for_range(
    pool: &Pool<Postgres>,
    operator_id: i64,
    date_from: NaiveDate,
    date_to: NaiveDate,
    metric: EvalMetric,
) -> sqlx::Result<i64> {
    // Column picked by exhaustive match, so a new EvalMetric variant cannot
    // compile without an aggregation column.
    let sql = match metric {
        EvalMetric::IndicatorsDone => {
            r#"SELECT COALESCE(SUM(COALESCE(indicators_done, 0)), 0) FROM calls
               WHERE operator_id = $1 AND deleted_at IS NULL
                 AND call_start_date::date >= $2 AND call_start_date::date <= $3"#
        }
        EvalMetric::PenaltySum => {
            r#"SELECT COALESCE(SUM(COALESCE(penalty_sum, 0)), 0) FROM calls
               WHERE operator_id = $1 AND deleted_at IS NULL
                 AND call_start_date::date >= $2 AND call_start_date::date <= $3"#
        }
        EvalMetric::StagesDone => {
            r#"SELECT COALESCE(SUM(COALESCE(stages_done, 0)), 0) FROM calls
               WHERE operator_id = $1 AND deleted_at IS NULL
                 AND call_start_date::date >= $2 AND call_start_date::date <= $3"#
        }
    };

    query_scalar::<_, i64>(sql)
        .bind(operator_id)
        .bind(date_from)
        .bind(date_to)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRow {
        scope: ProbeScope,
        period_type: PeriodType,
        target_mode: TargetMode,
        period_date: NaiveDate,
        metric: PlanMetric,
        value: i32,
    }

    struct FakeTargets {
        rows: Vec<FakeRow>,
    }

    impl TargetProbes for FakeTargets {
        async fn target_value(
            &self,
            scope: ProbeScope,
            _operator_id: i64,
            period_type: PeriodType,
            target_mode: TargetMode,
            period_date: NaiveDate,
            metric: PlanMetric,
        ) -> sqlx::Result<Option<i32>> {
            Ok(self
                .rows
                .iter()
                .find(|r| {
                    r.scope == scope
                        && r.period_type == period_type
                        && r.target_mode == target_mode
                        && r.period_date == period_date
                        && r.metric == metric
                })
                .map(|r| r.value))
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, day).unwrap()
    }

    fn dept_month_per_day(value: i32) -> FakeRow {
        FakeRow {
            scope: ProbeScope::Department,
            period_type: PeriodType::Month,
            target_mode: TargetMode::PerDay,
            period_date: d(1),
            metric: PlanMetric::IndicatorsDone,
            value,
        }
    }

    #[tokio::test]
    async fn department_month_norm_applies_when_operator_has_no_targets() {
        let store = FakeTargets { rows: vec![dept_month_per_day(20)] };
        let got = resolve_daily(&store, 7, d(15), PlanMetric::IndicatorsDone).await.unwrap();
        assert_eq!(got, (Some(20), Some(TargetSource::DeptMonthPerDay)));
    }

    #[tokio::test]
    async fn operator_day_target_overrides_department_norm() {
        let store = FakeTargets {
            rows: vec![
                dept_month_per_day(20),
                FakeRow {
                    scope: ProbeScope::Operator,
                    period_type: PeriodType::Day,
                    target_mode: TargetMode::Total,
                    period_date: d(15),
                    metric: PlanMetric::IndicatorsDone,
                    value: 30,
                },
            ],
        };
        let got = resolve_daily(&store, 7, d(15), PlanMetric::IndicatorsDone).await.unwrap();
        assert_eq!(got, (Some(30), Some(TargetSource::OperatorDay)));
        // other days of the month still fall through to the department norm
        let other = resolve_daily(&store, 7, d(16), PlanMetric::IndicatorsDone).await.unwrap();
        assert_eq!(other, (Some(20), Some(TargetSource::DeptMonthPerDay)));
    }

    #[tokio::test]
    async fn operator_month_norm_beats_department_day_target() {
        let store = FakeTargets {
            rows: vec![
                FakeRow {
                    scope: ProbeScope::Operator,
                    period_type: PeriodType::Month,
                    target_mode: TargetMode::PerDay,
                    period_date: d(1),
                    metric: PlanMetric::IndicatorsDone,
                    value: 25,
                },
                FakeRow {
                    scope: ProbeScope::Department,
                    period_type: PeriodType::Day,
                    target_mode: TargetMode::Total,
                    period_date: d(15),
                    metric: PlanMetric::IndicatorsDone,
                    value: 40,
                },
            ],
        };
        let got = resolve_daily(&store, 7, d(15), PlanMetric::IndicatorsDone).await.unwrap();
        assert_eq!(got, (Some(25), Some(TargetSource::OperatorMonthPerDay)));
    }

    #[tokio::test]
    async fn department_day_target_beats_department_month_norm() {
        let store = FakeTargets {
            rows: vec![
                dept_month_per_day(20),
                FakeRow {
                    scope: ProbeScope::Department,
                    period_type: PeriodType::Day,
                    target_mode: TargetMode::Total,
                    period_date: d(15),
                    metric: PlanMetric::IndicatorsDone,
                    value: 40,
                },
            ],
        };
        let got = resolve_daily(&store, 7, d(15), PlanMetric::IndicatorsDone).await.unwrap();
        assert_eq!(got, (Some(40), Some(TargetSource::DeptDay)));
    }

    #[tokio::test]
    async fn no_rows_resolves_to_no_target() {
        let store = FakeTargets { rows: vec![] };
        let got = resolve_daily(&store, 7, d(15), PlanMetric::IndicatorsDone).await.unwrap();
        assert_eq!(got, (None, None));
    }

    #[tokio::test]
    async fn metric_mismatch_does_not_resolve() {
        let store = FakeTargets { rows: vec![dept_month_per_day(20)] };
        let got = resolve_daily(&store, 7, d(15), PlanMetric::PenaltySum).await.unwrap();
        assert_eq!(got, (None, None));
    }
}
