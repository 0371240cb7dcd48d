//! Plain-text rendering of the client views.

use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use crate::client::views::{self, MonthlyStats};
use crate::db::models::Match;

const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// One line per match, in the order given.
pub fn match_table(matches: &[Match]) -> String {
    if matches.is_empty() {
        return "no matches yet\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<10}  {:<5}  {:<18}  {:<18}  {:<10}  {}",
        "id", "date", "time", "club", "team", "status", "result"
    );
    for m in matches {
        let _ = writeln!(
            out,
            "{:>4}  {:<10}  {:<5}  {:<18}  {:<18}  {:<10}  {}",
            m.id,
            m.date,
            m.time.as_deref().unwrap_or("-"),
            m.club,
            m.team,
            m.status,
            m.result.as_deref().unwrap_or("-"),
        );
    }
    out
}

pub fn stats(stats: &MonthlyStats) -> String {
    format!(
        "total matches:  {}\nthis month:     {}\n",
        stats.total, stats.this_month
    )
}

/// Month grid for the month containing `cursor`.
///
/// Days with at least one match get a `*`, `today` is bracketed and days borrowed from
/// neighbouring months are shown in parentheses.
pub fn calendar(cursor: NaiveDate, today: NaiveDate, matches: &[Match]) -> String {
    let grid = views::calendar_grid(cursor);
    let by_date = views::group_by_date(matches);

    let mut out = format!("{}\n", cursor.format("%B %Y"));
    for day in WEEKDAYS {
        let _ = write!(out, " {day:^4} ");
    }
    out.push('\n');

    for week in grid.chunks(7) {
        for cell in week {
            let key = cell.date.format("%Y-%m-%d").to_string();
            let mark = if by_date.contains_key(key.as_str()) { '*' } else { ' ' };
            let day = cell.date.day();
            if cell.date == today {
                let _ = write!(out, " [{day:>2}]{mark}");
            } else if cell.in_month {
                let _ = write!(out, "  {day:>2}{mark} ");
            } else {
                let _ = write!(out, " ({day:>2}){mark}");
            }
        }
        out.push('\n');
    }

    let in_month: Vec<&Match> = grid
        .iter()
        .filter(|c| c.in_month)
        .filter_map(|c| by_date.get(c.date.format("%Y-%m-%d").to_string().as_str()))
        .flatten()
        .copied()
        .collect();
    if !in_month.is_empty() {
        out.push('\n');
        for m in in_month {
            let _ = writeln!(
                out,
                "{} {}  {} ({})",
                m.date,
                m.time.as_deref().unwrap_or("--:--"),
                m.club,
                m.team
            );
        }
    }

    out
}
