//! Habit streaks.

use chrono::{Days, NaiveDate};

/// Length of the run of consecutive check-in days ending today, or ending
/// yesterday when today has no check-in yet.
///
/// `dates` may be unsorted and contain duplicates.
#[must_use]
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut sorted: Vec<NaiveDate> = dates.iter().copied().filter(|d| *d <= today).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let Some(&last) = sorted.last() else {
        return 0;
    };
    let yesterday = today.checked_sub_days(Days::new(1));
    if last != today && Some(last) != yesterday {
        return 0;
    }

    let mut streak = 0;
    let mut expected = last;
    for date in sorted.iter().rev() {
        if *date != expected {
            break;
        }
        streak += 1;
        match expected.checked_sub_days(Days::new(1)) {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn streak_ending_today() {
        let dates = [d("2026-03-01"), d("2026-03-02"), d("2026-03-03")];
        assert_eq!(current_streak(&dates, d("2026-03-03")), 3);
    }

    #[test]
    fn streak_ending_yesterday_still_counts() {
        let dates = [d("2026-03-02"), d("2026-03-01")];
        assert_eq!(current_streak(&dates, d("2026-03-03")), 2);
    }

    #[test]
    fn gap_breaks_streak() {
        let dates = [d("2026-03-01"), d("2026-03-03")];
        assert_eq!(current_streak(&dates, d("2026-03-03")), 1);
    }

    #[test]
    fn stale_check_ins_give_zero() {
        let dates = [d("2026-02-01")];
        assert_eq!(current_streak(&dates, d("2026-03-03")), 0);
        assert_eq!(current_streak(&[], d("2026-03-03")), 0);
    }

    #[test]
    fn duplicates_and_future_dates_ignored() {
        let dates = [d("2026-03-03"), d("2026-03-03"), d("2026-03-04")];
        assert_eq!(current_streak(&dates, d("2026-03-03")), 1);
    }
}
