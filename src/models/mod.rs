// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ───────────────────────────────────────
// Closed enums (mirror the Postgres types 1:1)
// ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "plan_metric", rename_all = "snake_case")]
pub enum PlanMetric {
    CallsTotal,
    CallsSuccess,
    ClientsTotal,
    ClientsSuccess,
    AvgDuration,
    TotalTalkTime,
    IndicatorsDone,
    PenaltySum,
    StagesDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "plan_period_type", rename_all = "snake_case")]
pub enum PeriodType {
    Day,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "plan_target_mode", rename_all = "snake_case")]
pub enum TargetMode {
    PerDay,
    Total,
}

/// Metrics that can be evaluated against actuals — the ones with a
/// per-call counter column in `calls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMetric {
    IndicatorsDone,
    PenaltySum,
    StagesDone,
}

impl EvalMetric {
    pub fn as_plan_metric(self) -> PlanMetric {
        match self {
            EvalMetric::IndicatorsDone => PlanMetric::IndicatorsDone,
            EvalMetric::PenaltySum => PlanMetric::PenaltySum,
            EvalMetric::StagesDone => PlanMetric::StagesDone,
        }
    }

    /// penalty_sum is the only metric where a smaller actual beats the target.
    pub fn lower_is_better(self) -> bool {
        matches!(self, EvalMetric::PenaltySum)
    }
}

/// Which precedence tier produced a resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSource {
    #[serde(rename = "operator/day")]
    OperatorDay,
    #[serde(rename = "operator/month_per_day")]
    OperatorMonthPerDay,
    #[serde(rename = "dept/day")]
    DeptDay,
    #[serde(rename = "dept/month_per_day")]
    DeptMonthPerDay,
    #[serde(rename = "operator/month_total")]
    OperatorMonthTotal,
    #[serde(rename = "dept/month_total")]
    DeptMonthTotal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Good,
    Average,
    Bad,
    NoTarget,
}

// ───────────────────────────────────────
// Subject: department XOR operator
// ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Operator(i64),
    Department(i64),
}

impl Subject {
    /// Builds from the two optional id fields every subject-scoped request
    /// carries. Exactly one must be set.
    pub fn from_ids(operator_id: Option<i64>, department_id: Option<i64>) -> Result<Self, String> {
        match (operator_id, department_id) {
            (Some(op), None) => Ok(Subject::Operator(op)),
            (None, Some(dep)) => Ok(Subject::Department(dep)),
            _ => Err("exactly one of operator_id or department_id must be set".into()),
        }
    }

    pub fn operator_id(self) -> Option<i64> {
        match self {
            Subject::Operator(id) => Some(id),
            Subject::Department(_) => None,
        }
    }

    pub fn department_id(self) -> Option<i64> {
        match self {
            Subject::Department(id) => Some(id),
            Subject::Operator(_) => None,
        }
    }
}

// ───────────────────────────────────────
// Rows
// ───────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Operator {
    pub id: i64,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
    pub date_register: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub uf_head: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Call {
    pub id: i64,
    pub operator_id: Option<i64>,
    pub phone_number: String,
    pub call_start_date: DateTime<Utc>,
    pub call_duration: i32,
    pub indicators_done: Option<i32>,
    pub penalty_sum: Option<i32>,
    pub stages_done: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct PlanTarget {
    pub id: i64,
    pub period_type: PeriodType,
    pub target_mode: TargetMode,
    pub metric: PlanMetric,
    pub period_date: NaiveDate,
    pub target_value: i32,
    pub department_id: Option<i64>,
    pub operator_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_requires_exactly_one_id() {
        assert_eq!(Subject::from_ids(Some(7), None), Ok(Subject::Operator(7)));
        assert_eq!(Subject::from_ids(None, Some(3)), Ok(Subject::Department(3)));
        assert!(Subject::from_ids(None, None).is_err());
        assert!(Subject::from_ids(Some(7), Some(3)).is_err());
    }

    #[test]
    fn only_penalty_sum_is_lower_is_better() {
        assert!(EvalMetric::PenaltySum.lower_is_better());
        assert!(!EvalMetric::IndicatorsDone.lower_is_better());
        assert!(!EvalMetric::StagesDone.lower_is_better());
    }
}
