//! Calendar helpers: week boundaries, ISO week numbers, due-date labels and
//! natural-language due input.

use chrono::{Datelike, Duration, NaiveDate};

/// Monday of the week containing `day`. Sunday belongs to the preceding Monday.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Calculate the start and end dates of the ISO week (Monday to Sunday) containing `today`.
pub fn start_end_of_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = week_start(today);
    (start, start + Duration::days(6))
}

/// ISO-8601 week number: week 1 holds the year's first Thursday.
pub fn iso_week_number(day: NaiveDate) -> u32 {
    day.iso_week().week()
}

/// "Jan 15 - Jan 21, 2024" for the seven days starting at `start`.
pub fn week_date_range(start: NaiveDate) -> String {
    let end = start + Duration::days(6);
    format!("{} - {}", start.format("%b %-d"), end.format("%b %-d, %Y"))
}

/// Start of the period that follows one beginning at `period_start`.
///
/// Normally this is the next Monday. When a rollover happens late (several weeks
/// after `period_start`) the new period starts at the Monday of the current week,
/// so the board never runs a period that starts in the past by more than a week.
pub fn next_period_start(period_start: NaiveDate, today: NaiveDate) -> NaiveDate {
    let following = week_start(period_start) + Duration::days(7);
    following.max(week_start(today))
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Format a due date relative to today ("Today", "Tomorrow", "3d", "2d overdue", "Jan 23").
pub fn format_due(due: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(d) = due else {
        return String::new();
    };
    let diff = days_between(today, d);
    match diff {
        0 => "Today".into(),
        1 => "Tomorrow".into(),
        -1 => "Yesterday".into(),
        n if n < 0 => format!("{}d overdue", -n),
        n if n <= 7 => format!("{n}d"),
        _ => d.format("%b %-d").to_string(),
    }
}

/// Parse a stored date, tolerating a trailing time component ("2024-01-15T00:00:00Z").
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Parse human-readable due date input.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday".."sunday" (and short forms), "next friday", "this friday"
/// - "end of week"/"eow", "end of month"/"eom", "weekend"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD"
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => return Some(start_end_of_week(today).1),
        "end of month" | "eom" => {
            let (y, m) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            return Some(NaiveDate::from_ymd_opt(y, m, 1)? - Duration::days(1));
        }
        "this weekend" | "weekend" => {
            let ahead = (5 + 7 - today.weekday().num_days_from_monday() as i64) % 7;
            return Some(today + Duration::days(ahead));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let split = rest.char_indices().last().map(|(i, _)| i).unwrap_or(0);
        let (num, unit) = rest.split_at(split);
        if let Ok(n) = num.trim().parse::<i64>() {
            let days = match unit {
                "d" => Some(n),
                "w" => n.checked_mul(7),
                // Approximate: 30 days per month
                "m" => n.checked_mul(30),
                _ => return None,
            };
            // Offsets past chrono's range read as unparseable.
            return days
                .and_then(Duration::try_days)
                .and_then(|delta| today.checked_add_signed(delta));
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current = today.weekday().num_days_from_monday() as i64;
    for (name, target) in weekdays {
        let ahead = (target + 7 - current) % 7;
        if s == name || s == format!("this {name}") {
            return Some(today + Duration::days(ahead));
        }
        if s == format!("next {name}") {
            let add = if ahead == 0 { 7 } else { ahead + 7 };
            return Some(today + Duration::days(add));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Serde adapter for optional dates stored as "YYYY-MM-DD", where "" or null means none.
pub mod optional_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_iso_date(s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date '{s}'"))),
        }
    }
}

/// Serde adapter that reads "" as `None`.
pub mod optional_text {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|s| !s.trim().is_empty()))
    }
}
