//! Daily intake aggregation
//!
//! Buckets meal entries into UTC calendar days, sums energy and macros, and
//! measures the day against the calorie target. Nothing is cached between
//! calls: callers re-run these after adding or deleting a meal.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::types::{DailyTotals, DaySummary, MealEntry, Progress};

/// First and last millisecond belonging to `date`, both inclusive.
///
/// The range ends at 23:59:59.999, matching how the meal store is queried.
/// Timestamps carry nanoseconds, so an instant such as 23:59:59.9995 lies past
/// `end`; [`filter_by_day`] buckets by calendar date and still counts it.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Entries whose `created_at` falls on `date` (UTC)
pub fn filter_by_day<'a, I>(entries: I, date: NaiveDate) -> Vec<&'a MealEntry>
where
    I: IntoIterator<Item = &'a MealEntry>,
{
    entries
        .into_iter()
        .filter(|entry| entry.created_at.date_naive() == date)
        .collect()
}

/// Sum energy and macros; an empty set gives all zeros
pub fn aggregate<'a, I>(entries: I) -> DailyTotals
where
    I: IntoIterator<Item = &'a MealEntry>,
{
    entries
        .into_iter()
        .fold(DailyTotals::default(), |mut totals, entry| {
            totals.calories += i64::from(entry.calories);
            totals.protein += entry.protein;
            totals.fat += entry.fat;
            totals.carbs += entry.carbs;
            totals.meal_count += 1;
            totals
        })
}

/// Measure eaten energy against the target.
///
/// A non-positive target means no profile has been set up yet; percent is 0.
pub fn progress(total_calories: i64, target_kcal: i64) -> Progress {
    let percent = if target_kcal > 0 {
        (total_calories as f64 / target_kcal as f64 * 100.0).min(100.0)
    } else {
        0.0
    };

    Progress {
        remaining_kcal: target_kcal - total_calories,
        percent,
        over_target: target_kcal > 0 && total_calories > target_kcal,
    }
}

/// Stateless day summarizer
pub struct DailyAggregator;

impl DailyAggregator {
    /// Filter, total and measure one day of meals
    pub fn summarize(entries: &[MealEntry], date: NaiveDate, target_kcal: i64) -> DaySummary {
        let mut meals: Vec<MealEntry> = filter_by_day(entries, date).into_iter().cloned().collect();
        meals.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let totals = aggregate(&meals);

        DaySummary {
            date,
            target_kcal,
            totals,
            display: totals.display(),
            progress: progress(totals.calories, target_kcal),
            meals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn meal_at(calories: u32, created_at: DateTime<Utc>) -> MealEntry {
        MealEntry::new("user-1", "meal", calories, 10.4, 5.2, 30.1, created_at)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds(date());
        assert_eq!(start.to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert_eq!(
            end,
            "2024-01-15T23:59:59.999Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_filter_boundaries_inclusive() {
        let first = meal_at(100, "2024-01-15T00:00:00.000Z".parse().unwrap());
        let last = meal_at(200, "2024-01-15T23:59:59.999Z".parse().unwrap());
        let next_day = meal_at(400, "2024-01-16T00:00:00.000Z".parse().unwrap());
        let prev_day = meal_at(800, "2024-01-14T23:59:59.999Z".parse().unwrap());
        let entries = vec![first, last, next_day, prev_day];

        let filtered = filter_by_day(&entries, date());
        let calories: Vec<u32> = filtered.iter().map(|m| m.calories).collect();
        assert_eq!(calories, vec![100, 200]);
    }

    #[test]
    fn test_filter_keeps_sub_millisecond_end_of_day() {
        let late = meal_at(150, "2024-01-15T23:59:59.999500Z".parse().unwrap());
        let (_, end) = day_bounds(date());
        assert!(late.created_at > end);

        let entries = vec![late];
        assert_eq!(filter_by_day(&entries, date()).len(), 1);
        assert!(filter_by_day(&entries, date().succ_opt().unwrap()).is_empty());
    }

    #[test]
    fn test_aggregate_sums() {
        let entries: Vec<MealEntry> = [300, 250, 450].into_iter().map(|c| meal_at(c, noon())).collect();
        let totals = aggregate(&entries);

        assert_eq!(totals.calories, 1000);
        assert_eq!(totals.meal_count, 3);
        assert!((totals.protein - 31.2).abs() < 1e-9);
        assert!((totals.carbs - 90.3).abs() < 1e-9);
        assert_eq!(totals.display().carbs, 90);
    }

    #[test]
    fn test_aggregate_empty() {
        let entries: Vec<MealEntry> = Vec::new();
        let totals = aggregate(&entries);
        assert_eq!(totals, DailyTotals::default());

        let p = progress(totals.calories, 0);
        assert_eq!(p.percent, 0.0);
        assert_eq!(p.remaining_kcal, 0);
        assert!(!p.over_target);
    }

    #[test]
    fn test_progress_caps_at_100() {
        let p = progress(2500, 2000);
        assert_eq!(p.percent, 100.0);
        assert_eq!(p.remaining_kcal, -500);
        assert!(p.over_target);

        let p = progress(500, 2000);
        assert_eq!(p.percent, 25.0);
        assert_eq!(p.remaining_kcal, 1500);
        assert!(!p.over_target);
    }

    #[test]
    fn test_progress_negative_target() {
        let p = progress(300, -10);
        assert_eq!(p.percent, 0.0);
        assert_eq!(p.remaining_kcal, -310);
    }

    #[test]
    fn test_summarize_orders_newest_first() {
        let early = meal_at(300, Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap());
        let late = meal_at(700, Utc.with_ymd_and_hms(2024, 1, 15, 19, 30, 0).unwrap());
        let other = meal_at(900, Utc.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap());
        let entries = vec![early.clone(), other, late.clone()];

        let summary = DailyAggregator::summarize(&entries, date(), 2000);

        assert_eq!(summary.meals, vec![late, early]);
        assert_eq!(summary.totals.calories, 1000);
        assert_eq!(summary.progress.percent, 50.0);
        assert_eq!(summary.progress.remaining_kcal, 1000);
    }
}
