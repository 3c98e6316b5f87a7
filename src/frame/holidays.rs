use std::collections::{BTreeSet, HashMap};

use chrono::{Duration, NaiveDate};

use crate::error::{Error, Result};

/// Source of public holiday dates for one country.
pub trait HolidayCalendar: Send + Sync {
    fn holidays(&self, year: i32) -> BTreeSet<NaiveDate>;
}

/// National holidays made of fixed calendar dates and days defined relative
/// to Easter Sunday.
#[derive(Debug, Clone)]
pub struct NationalCalendar {
    fixed: Vec<(u32, u32)>,
    easter_offsets: Vec<i64>,
}

impl NationalCalendar {
    pub fn new(fixed: Vec<(u32, u32)>, easter_offsets: Vec<i64>) -> Self {
        Self {
            fixed,
            easter_offsets,
        }
    }

    pub fn france() -> Self {
        Self::new(
            vec![(1, 1), (5, 1), (5, 8), (7, 14), (8, 15), (11, 1), (11, 11), (12, 25)],
            vec![1, 39, 50],
        )
    }

    pub fn germany() -> Self {
        Self::new(
            vec![(1, 1), (5, 1), (10, 3), (12, 25), (12, 26)],
            vec![-2, 1, 39, 50],
        )
    }

    pub fn italy() -> Self {
        Self::new(
            vec![
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
            ],
            vec![0, 1],
        )
    }
}

impl HolidayCalendar for NationalCalendar {
    fn holidays(&self, year: i32) -> BTreeSet<NaiveDate> {
        let mut dates: BTreeSet<NaiveDate> = self
            .fixed
            .iter()
            .filter_map(|&(month, day)| NaiveDate::from_ymd_opt(year, month, day))
            .collect();

        if let Some(easter) = easter_sunday(year) {
            dates.extend(
                self.easter_offsets
                    .iter()
                    .map(|&offset| easter + Duration::days(offset)),
            );
        }

        dates
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
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

/// Holiday calendars indexed by country code.
pub struct HolidayRegistry {
    calendars: HashMap<String, Box<dyn HolidayCalendar>>,
}

impl HolidayRegistry {
    pub fn empty() -> Self {
        Self {
            calendars: HashMap::new(),
        }
    }

    pub fn register<C: HolidayCalendar + 'static>(&mut self, country: &str, calendar: C) {
        self.calendars
            .insert(country.to_uppercase(), Box::new(calendar));
    }

    pub fn calendar(&self, country: &str) -> Result<&dyn HolidayCalendar> {
        self.calendars
            .get(&country.to_uppercase())
            .map(|calendar| calendar.as_ref())
            .ok_or_else(|| Error::UnknownCountry(country.to_string()))
    }

    /// All holidays of `country` over `years`.
    pub fn holidays<I>(&self, country: &str, years: I) -> Result<BTreeSet<NaiveDate>>
    where
        I: IntoIterator<Item = i32>,
    {
        let calendar = self.calendar(country)?;
        Ok(years
            .into_iter()
            .flat_map(|year| calendar.holidays(year))
            .collect())
    }
}

impl Default for HolidayRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("FR", NationalCalendar::france());
        registry.register("DE", NationalCalendar::germany());
        registry.register("IT", NationalCalendar::italy());
        registry
    }
}
