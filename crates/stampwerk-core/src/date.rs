// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Calendar normalization for the registration stamp's date fields.
//
// The date is entered as three free-text fields. Whatever the user types, the
// stamp must still render, so every field falls back to a valid value instead
// of failing: unparseable parts come from "today", the day is clamped to the
// month length, and two-digit years are expanded into the 2000s.

use chrono::{Datelike, NaiveDate};

/// Month names in the genitive case, as written after a day number.
pub const MONTHS_GENITIVE: [&str; 12] = [
    "січня",
    "лютого",
    "березня",
    "квітня",
    "травня",
    "червня",
    "липня",
    "серпня",
    "вересня",
    "жовтня",
    "листопада",
    "грудня",
];

/// A calendar-valid date resolved from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDate {
    date: NaiveDate,
}

impl NormalizedDate {
    /// Resolve `day`/`month`/`year` text into a real date.
    ///
    /// `today` supplies the fallback for any part that cannot be parsed.
    pub fn resolve(day: &str, month: &str, year: &str, today: NaiveDate) -> Self {
        let month_num = parse_month(month)
            .filter(|m| (1..=12).contains(m))
            .unwrap_or_else(|| today.month());

        let year_tail = year
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|y| *y >= 0)
            .unwrap_or(today.year() % 100);
        let full_year = if year_tail <= 99 {
            2000 + year_tail
        } else {
            year_tail
        };
        let full_year = full_year.clamp(1, 9999);

        let max_day = days_in_month(full_year, month_num);
        let day_num = day
            .trim()
            .parse::<i64>()
            .ok()
            .map(|d| d.clamp(1, i64::from(max_day)) as u32)
            .unwrap_or_else(|| today.day().min(max_day));

        // All three parts are in range by construction.
        let date = NaiveDate::from_ymd_opt(full_year, month_num, day_num).unwrap_or(today);
        Self { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Two-digit day, e.g. `"05"`.
    pub fn day_text(&self) -> String {
        format!("{:02}", self.date.day())
    }

    /// Genitive month name.
    pub fn month_text(&self) -> &'static str {
        month_name(self.date.month())
    }

    /// Two-digit year tail, e.g. `"24"`.
    pub fn year_tail_text(&self) -> String {
        format!("{:02}", self.date.year().rem_euclid(100))
    }
}

/// Genitive month name for a 1-based month number (falls back to January).
pub fn month_name(month: u32) -> &'static str {
    let index = month.clamp(1, 12) as usize - 1;
    MONTHS_GENITIVE[index]
}

/// Accept either a number or a month name (case-insensitive).
pub fn parse_month(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return u32::try_from(n).ok();
    }
    let lowered = trimmed.to_lowercase();
    MONTHS_GENITIVE
        .iter()
        .position(|name| *name == lowered)
        .map(|i| i as u32 + 1)
}

/// Number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}
