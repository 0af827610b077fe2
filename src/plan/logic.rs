// src/plan/logic.rs
//
// Pure plan-evaluation policy: classification thresholds and calendar math.
// Everything here is store-free so it can be tested without a database.

use chrono::{Datelike, Days, NaiveDate};

use crate::models::{EvalMetric, PlanStatus};

/// Classify actual vs. target for one metric.
///
/// Higher-is-better metrics: good ≥ 100% of target, average ≥ 70%, else bad.
/// penalty_sum (lower-is-better): good ≤ target, average ≤ 130%, else bad.
/// A null target means no opinion is possible (`no_target`, null ratio).
pub fn classify(metric: EvalMetric, actual: i64, target: Option<i64>) -> (PlanStatus, Option<f64>) {
    let Some(target) = target else {
        return (PlanStatus::NoTarget, None);
    };
    let tgt = target.max(0);

    if metric.lower_is_better() {
        if tgt == 0 {
            let status = if actual == 0 { PlanStatus::Good } else { PlanStatus::Bad };
            return (status, None);
        }
        let ratio = actual as f64 / tgt as f64;
        let status = if actual <= tgt {
            PlanStatus::Good
        } else if actual as f64 <= tgt as f64 * 1.3 {
            PlanStatus::Average
        } else {
            PlanStatus::Bad
        };
        return (status, Some(ratio));
    }

    if tgt == 0 {
        let status = if actual > 0 { PlanStatus::Good } else { PlanStatus::Bad };
        return (status, None);
    }
    let ratio = actual as f64 / tgt as f64;
    let status = if ratio >= 1.0 {
        PlanStatus::Good
    } else if ratio >= 0.7 {
        PlanStatus::Average
    } else {
        PlanStatus::Bad
    };
    (status, Some(ratio))
}

/// A summed period target of 0 means no day contributed a target at all;
/// report "no target" rather than a misleading 0 goal.
pub fn nonzero_target(total: i64) -> Option<i64> {
    (total > 0).then_some(total)
}

/// First calendar day of the month `d` falls in.
pub fn month_first(d: NaiveDate) -> NaiveDate {
    d.with_day(1).expect("day 1 always exists")
}

/// Last calendar day of the month `d` falls in.
pub fn month_last(d: NaiveDate) -> NaiveDate {
    let next = if d.month() == 12 {
        NaiveDate::from_ymd_opt(d.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1)
    };
    next.expect("first of next month always exists") - Days::new(1)
}

/// Inclusive day range, ascending. Empty when `from > to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = from;
    while d <= to {
        days.push(d);
        d = d + Days::new(1);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvalMetric::{IndicatorsDone, PenaltySum};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn higher_is_better_thresholds() {
        assert_eq!(classify(IndicatorsDone, 10, Some(10)), (PlanStatus::Good, Some(1.0)));
        assert_eq!(classify(IndicatorsDone, 7, Some(10)), (PlanStatus::Average, Some(0.7)));
        assert_eq!(classify(IndicatorsDone, 6, Some(10)), (PlanStatus::Bad, Some(0.6)));
        assert_eq!(classify(IndicatorsDone, 15, Some(10)), (PlanStatus::Good, Some(1.5)));
    }

    #[test]
    fn lower_is_better_thresholds() {
        assert_eq!(classify(PenaltySum, 10, Some(10)), (PlanStatus::Good, Some(1.0)));
        assert_eq!(classify(PenaltySum, 13, Some(10)), (PlanStatus::Average, Some(1.3)));
        assert_eq!(classify(PenaltySum, 14, Some(10)), (PlanStatus::Bad, Some(1.4)));
        assert_eq!(classify(PenaltySum, 0, Some(10)), (PlanStatus::Good, Some(0.0)));
    }

    #[test]
    fn zero_target_edge_cases() {
        assert_eq!(classify(IndicatorsDone, 0, Some(0)), (PlanStatus::Bad, None));
        assert_eq!(classify(IndicatorsDone, 1, Some(0)), (PlanStatus::Good, None));
        assert_eq!(classify(PenaltySum, 0, Some(0)), (PlanStatus::Good, None));
        assert_eq!(classify(PenaltySum, 1, Some(0)), (PlanStatus::Bad, None));
    }

    #[test]
    fn null_target_is_no_target() {
        assert_eq!(classify(IndicatorsDone, 42, None), (PlanStatus::NoTarget, None));
        assert_eq!(classify(PenaltySum, 0, None), (PlanStatus::NoTarget, None));
    }

    #[test]
    fn negative_target_treated_as_zero() {
        assert_eq!(classify(IndicatorsDone, 5, Some(-3)), (PlanStatus::Good, None));
        assert_eq!(classify(PenaltySum, 5, Some(-3)), (PlanStatus::Bad, None));
    }

    #[test]
    fn zero_period_sum_means_no_target() {
        assert_eq!(nonzero_target(0), None);
        assert_eq!(nonzero_target(40), Some(40));
    }

    #[test]
    fn month_bounds() {
        assert_eq!(month_first(d(2025, 8, 15)), d(2025, 8, 1));
        assert_eq!(month_last(d(2025, 8, 15)), d(2025, 8, 31));
        assert_eq!(month_last(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(month_last(d(2025, 12, 3)), d(2025, 12, 31));
    }

    #[test]
    fn days_between_is_inclusive_and_ordered() {
        let days = days_between(d(2025, 8, 30), d(2025, 9, 2));
        assert_eq!(days, vec![d(2025, 8, 30), d(2025, 8, 31), d(2025, 9, 1), d(2025, 9, 2)]);
        assert!(days_between(d(2025, 8, 2), d(2025, 8, 1)).is_empty());
        assert_eq!(days_between(d(2025, 8, 1), d(2025, 8, 1)).len(), 1);
    }
}
