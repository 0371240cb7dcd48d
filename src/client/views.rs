//! Display-only views derived from the current match list.
//!
//! Everything here is a pure function of its inputs; the caller supplies the clock.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::constants::CALENDAR_CELLS;
use crate::db::models::Match;

/// Orders matches by how far their kick-off is from `now`, closest first.
///
/// The sort is stable, so equally distant matches keep their incoming (date descending) order.
/// Matches whose date cannot be read go last.
pub fn sort_by_proximity(mut matches: Vec<Match>, now: NaiveDateTime) -> Vec<Match> {
    matches.sort_by_key(|m| match m.kickoff() {
        Some(kickoff) => (false, (kickoff - now).num_seconds().abs()),
        None => (true, 0),
    });
    matches
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthlyStats {
    pub total: usize,
    pub this_month: usize,
}

/// Counts every match, and those falling in the same month and year as `today`.
pub fn monthly_stats(matches: &[Match], today: NaiveDate) -> MonthlyStats {
    let this_month = matches
        .iter()
        .filter_map(Match::naive_date)
        .filter(|d| d.year() == today.year() && d.month() == today.month())
        .count();

    MonthlyStats {
        total: matches.len(),
        this_month,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    /// `false` for the trailing/leading days borrowed from neighbouring months.
    pub in_month: bool,
}

pub type CalendarGrid = [CalendarCell; CALENDAR_CELLS];

/// Six Monday-first weeks covering the month that contains `cursor`.
pub fn calendar_grid(cursor: NaiveDate) -> CalendarGrid {
    let first = first_of_month(cursor);
    let lead = u64::from(first.weekday().num_days_from_monday());
    let start = first - Days::new(lead);

    std::array::from_fn(|i| {
        let date = start + Days::new(i as u64);
        CalendarCell {
            date,
            in_month: date.month() == first.month() && date.year() == first.year(),
        }
    })
}

/// Groups matches by their exact date string.
pub fn group_by_date(matches: &[Match]) -> BTreeMap<&str, Vec<&Match>> {
    let mut map: BTreeMap<&str, Vec<&Match>> = BTreeMap::new();
    for m in matches {
        map.entry(m.date.as_str()).or_default().push(m);
    }
    map
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month `offset` months away from `cursor`'s month.
pub fn shift_month(cursor: NaiveDate, offset: i32) -> NaiveDate {
    let first = first_of_month(cursor);
    let months = Months::new(offset.unsigned_abs());
    let shifted = if offset >= 0 {
        first.checked_add_months(months)
    } else {
        first.checked_sub_months(months)
    };

    shifted.unwrap_or(first)
}
