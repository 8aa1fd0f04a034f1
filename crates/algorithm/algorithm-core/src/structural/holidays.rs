//! National holiday calendars
//!
//! Fixed-date holidays, Easter-relative holidays and "n-th weekday of the
//! month" rules. Substitute days for holidays falling on a weekend are not
//! modelled.

use algorithm_spi::{Result, TsError};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Supported country codes
pub const SUPPORTED_COUNTRIES: [&str; 6] = ["DE", "ES", "FR", "GB", "IT", "US"];

/// Holiday calendar of one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    country: String,
}

impl HolidayCalendar {
    /// Calendar for an ISO 3166 alpha-2 code (case-insensitive)
    pub fn for_country(code: &str) -> Result<Self> {
        let country = code.trim().to_uppercase();
        if !SUPPORTED_COUNTRIES.contains(&country.as_str()) {
            return Err(TsError::invalid_parameter(
                "country_holidays",
                format!(
                    "no holiday calendar for '{}' (supported: {})",
                    code,
                    SUPPORTED_COUNTRIES.join(", ")
                ),
            ));
        }
        Ok(Self { country })
    }

    /// Country code of this calendar
    pub fn country(&self) -> &str {
        &self.country
    }

    /// Whether `date` is a national holiday
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays(date.year()).contains(&date)
    }

    /// All holidays of `year`, unsorted
    pub fn holidays(&self, year: i32) -> Vec<NaiveDate> {
        let fixed = |pairs: &[(u32, u32)]| -> Vec<NaiveDate> {
            pairs
                .iter()
                .filter_map(|&(m, d)| NaiveDate::from_ymd_opt(year, m, d))
                .collect()
        };
        let easter = easter_sunday(year);
        let from_easter = |offset: i64| easter.map(|e| e + Duration::days(offset));

        let mut days = match self.country.as_str() {
            "IT" => fixed(&[
                (1, 1),
                (1, 6),
                (4, 25),
                (5, 1),
                (6, 2),
                (8, 15),
                (11, 1),
                (12, 8),
                (12, 25),
                (12, 26),
            ]),
            "FR" => fixed(&[
                (1, 1),
                (5, 1),
                (5, 8),
                (7, 14),
                (8, 15),
                (11, 1),
                (11, 11),
                (12, 25),
            ]),
            "DE" => fixed(&[(1, 1), (5, 1), (10, 3), (12, 25), (12, 26)]),
            "ES" => fixed(&[
                (1, 1),
                (1, 6),
                (5, 1),
                (8, 15),
                (10, 12),
                (11, 1),
                (12, 6),
                (12, 8),
                (12, 25),
            ]),
            "GB" => fixed(&[(1, 1), (12, 25), (12, 26)]),
            "US" => fixed(&[(1, 1), (6, 19), (7, 4), (11, 11), (12, 25)]),
            _ => Vec::new(),
        };

        let movable: Vec<Option<NaiveDate>> = match self.country.as_str() {
            "IT" => vec![from_easter(1)],
            "FR" => vec![from_easter(1), from_easter(39), from_easter(50)],
            "DE" => vec![
                from_easter(-2),
                from_easter(1),
                from_easter(39),
                from_easter(50),
            ],
            "ES" => vec![from_easter(-2)],
            "GB" => vec![
                from_easter(-2),
                from_easter(1),
                NaiveDate::from_weekday_of_month_opt(year, 5, Weekday::Mon, 1),
                last_weekday_of_month(year, 5, Weekday::Mon),
                last_weekday_of_month(year, 8, Weekday::Mon),
            ],
            "US" => vec![
                NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 3),
                NaiveDate::from_weekday_of_month_opt(year, 2, Weekday::Mon, 3),
                last_weekday_of_month(year, 5, Weekday::Mon),
                NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1),
                NaiveDate::from_weekday_of_month_opt(year, 10, Weekday::Mon, 2),
                NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4),
            ],
            _ => Vec::new(),
        };

        days.extend(movable.into_iter().flatten());
        days
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = first_of_next.pred_opt()?;
    while day.weekday() != weekday {
        day = day.pred_opt()?;
    }
    Some(day)
}
