//! Month calendar widget
//!
//! `render` turns a month into a 7-column grid of labelled cells. Every cell
//! carries a token; day tokens encode the full ISO date and navigation tokens
//! encode the target month, so the widget keeps no state between renders.

use chrono::{Datelike, NaiveDate};
use std::fmt;

pub const DAY_PREFIX: &str = "cal:day:";
pub const NAV_PREFIX: &str = "cal:nav:";
pub const NOOP_TOKEN: &str = "cal:noop";

const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month. Years are limited to four digits so tokens stay ISO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9999;

    pub fn new(year: i32, month: u32) -> Option<Self> {
        let valid = (Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) && (1..=12).contains(&month);
        valid.then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year().clamp(Self::MIN_YEAR, Self::MAX_YEAR),
            month: date.month(),
        }
    }

    /// Previous month, wrapping January to December of the year before
    pub fn prev(self) -> Option<Self> {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    /// Next month, wrapping December to January of the year after
    pub fn next(self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    pub fn days(self) -> u32 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if NaiveDate::from_ymd_opt(self.year, 2, 29).is_some() => 29,
            2 => 28,
            _ => 31,
        }
    }

    pub fn day(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn label(self) -> String {
        let name = MONTH_NAMES
            .get(self.month as usize - 1)
            .copied()
            .unwrap_or("?");
        format!("{name} {}", self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// What a calendar cell does when selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarToken {
    Day(NaiveDate),
    Nav(YearMonth),
    /// Captions, weekday headers and padding
    Noop,
}

impl CalendarToken {
    pub fn encode(self) -> String {
        match self {
            CalendarToken::Day(date) => format!("{DAY_PREFIX}{}", date.format("%Y-%m-%d")),
            CalendarToken::Nav(month) => format!("{NAV_PREFIX}{month}"),
            CalendarToken::Noop => NOOP_TOKEN.to_string(),
        }
    }

    /// Decode a token. Returns `None` for anything that is not a calendar
    /// token, including malformed dates and months.
    pub fn decode(token: &str) -> Option<Self> {
        if token == NOOP_TOKEN {
            return Some(CalendarToken::Noop);
        }
        if let Some(rest) = token.strip_prefix(DAY_PREFIX) {
            let date = NaiveDate::parse_from_str(rest, "%Y-%m-%d").ok()?;
            return Some(CalendarToken::Day(date));
        }
        if let Some(rest) = token.strip_prefix(NAV_PREFIX) {
            let (year, month) = rest.split_once('-')?;
            let month = YearMonth::new(year.parse().ok()?, month.parse().ok()?)?;
            return Some(CalendarToken::Nav(month));
        }
        None
    }
}

// ============================================================================
// Grid
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCell {
    pub label: String,
    pub token: CalendarToken,
}

impl CalendarCell {
    fn noop(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: CalendarToken::Noop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    pub month: YearMonth,
    /// Previous-month arrow, month label, next-month arrow
    pub caption: [CalendarCell; 3],
    pub weekdays: [CalendarCell; 7],
    pub weeks: Vec<[CalendarCell; 7]>,
}

impl CalendarGrid {
    /// All rows top to bottom
    pub fn rows(&self) -> Vec<Vec<CalendarCell>> {
        let mut rows = Vec::with_capacity(self.weeks.len() + 2);
        rows.push(self.caption.to_vec());
        rows.push(self.weekdays.to_vec());
        rows.extend(self.weeks.iter().map(|w| w.to_vec()));
        rows
    }

    /// Every selectable date in the grid
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.weeks.iter().flatten().filter_map(|cell| match cell.token {
            CalendarToken::Day(date) => Some(date),
            _ => None,
        })
    }
}

/// Render a month as a Monday-first grid
pub fn render(month: YearMonth) -> CalendarGrid {
    let nav = |target: Option<YearMonth>, arrow: &str| match target {
        Some(target) => CalendarCell {
            label: arrow.to_string(),
            token: CalendarToken::Nav(target),
        },
        None => CalendarCell::noop(" "),
    };
    let caption = [
        nav(month.prev(), "<"),
        CalendarCell::noop(month.label()),
        nav(month.next(), ">"),
    ];
    let weekdays = WEEKDAYS.map(CalendarCell::noop);

    let offset = month
        .day(1)
        .map_or(0, |first| first.weekday().num_days_from_monday() as usize);
    let mut cells: Vec<CalendarCell> = (0..offset).map(|_| CalendarCell::noop(" ")).collect();
    for day in 1..=month.days() {
        cells.push(match month.day(day) {
            Some(date) => CalendarCell {
                label: day.to_string(),
                token: CalendarToken::Day(date),
            },
            None => CalendarCell::noop(" "),
        });
    }
    while cells.len() % 7 != 0 {
        cells.push(CalendarCell::noop(" "));
    }

    let weeks = cells
        .chunks(7)
        .map(|week| std::array::from_fn(|i| week[i].clone()))
        .collect();

    CalendarGrid {
        month,
        caption,
        weekdays,
        weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_march_2025_layout() {
        // 1 March 2025 is a Saturday
        let grid = render(ym(2025, 3));
        assert_eq!(grid.caption[1].label, "March 2025");
        assert_eq!(grid.weekdays[0].label, "Mo");
        assert_eq!(grid.weeks.len(), 6);
        assert_eq!(grid.weeks[0][4].token, CalendarToken::Noop);
        assert_eq!(grid.weeks[0][5].label, "1");
        assert_eq!(grid.dates().count(), 31);
        assert_eq!(
            grid.weeks[2][0].token.encode(),
            "cal:day:2025-03-10"
        );
    }

    #[test]
    fn test_month_wraps_at_year_boundaries() {
        assert_eq!(ym(2025, 1).prev(), Some(ym(2024, 12)));
        assert_eq!(ym(2024, 12).next(), Some(ym(2025, 1)));
        assert_eq!(ym(9999, 12).next(), None);
        assert_eq!(ym(1, 1).prev(), None);
    }

    #[test]
    fn test_caption_tokens_point_at_neighbours() {
        let grid = render(ym(2025, 1));
        assert_eq!(grid.caption[0].token, CalendarToken::Nav(ym(2024, 12)));
        assert_eq!(grid.caption[2].token, CalendarToken::Nav(ym(2025, 2)));
        assert_eq!(grid.caption[1].token, CalendarToken::Noop);
    }

    #[test]
    fn test_leap_february() {
        assert_eq!(ym(2024, 2).days(), 29);
        assert_eq!(ym(2025, 2).days(), 28);
        assert_eq!(ym(1900, 2).days(), 28);
        assert_eq!(ym(2000, 2).days(), 29);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(CalendarToken::decode("cal:day:2025-02-30"), None);
        assert_eq!(CalendarToken::decode("cal:nav:2025-13"), None);
        assert_eq!(CalendarToken::decode("cal:nav:abc"), None);
        assert_eq!(CalendarToken::decode("attach_file"), None);
        assert_eq!(CalendarToken::decode(NOOP_TOKEN), Some(CalendarToken::Noop));
    }

    proptest! {
        #[test]
        fn prop_day_tokens_parse_back_into_rendered_month(year in 1i32..=9999, month in 1u32..=12) {
            let m = ym(year, month);
            let grid = render(m);
            for cell in grid.weeks.iter().flatten() {
                if let CalendarToken::Day(_) = cell.token {
                    let decoded = CalendarToken::decode(&cell.token.encode());
                    match decoded {
                        Some(CalendarToken::Day(date)) => prop_assert_eq!(YearMonth::of(date), m),
                        other => prop_assert!(false, "decoded {:?}", other),
                    }
                }
            }
            prop_assert_eq!(grid.dates().count() as u32, m.days());
            let rows = grid.rows();
            prop_assert_eq!(rows[0].len(), 3);
            prop_assert!(rows[1..].iter().all(|row| row.len() == 7));
        }

        #[test]
        fn prop_next_then_prev_is_identity(year in 1i32..9999, month in 1u32..=12) {
            let m = ym(year, month);
            prop_assert_eq!(m.next().and_then(YearMonth::prev), Some(m));
            if year > 1 {
                prop_assert_eq!(m.prev().and_then(YearMonth::next), Some(m));
            }
        }

        #[test]
        fn prop_nav_tokens_round_trip(year in 1i32..=9999, month in 1u32..=12) {
            let token = CalendarToken::Nav(ym(year, month));
            prop_assert_eq!(CalendarToken::decode(&token.encode()), Some(token));
        }
    }
}
