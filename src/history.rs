//! History browser.
//!
//! The history page loads the full backend history once (newest first) and
//! lets the user filter it by date, search it, page through it, chart the
//! last N points and export it. None of this touches the live reconciler.

use crate::error::{DashboardError, Result};
use crate::input::poll::Fetcher;
use crate::presentation::to_csv;
use crate::telemetry::{Field, Payload, Sample};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;

/// Table rows per page.
pub const ROWS_PER_PAGE: usize = 10;

/// Count and averages over a set of rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStats {
    pub count: usize,
    pub avg_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub avg_air_quality: Option<f64>,
}

/// One table page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub number: usize,
    pub total_pages: usize,
    pub rows: &'a [Sample],
}

pub struct HistoryBrowser {
    /// Newest first, as delivered
    all: Vec<Sample>,
    /// Current selection, newest first
    filtered: Vec<Sample>,
}

impl HistoryBrowser {
    pub fn new(newest_first: Vec<Sample>) -> Self {
        Self {
            filtered: newest_first.clone(),
            all: newest_first,
        }
    }

    /// Fetch the full history from the backend.
    pub async fn load(fetcher: &dyn Fetcher, url: &str) -> Result<Self> {
        let body = fetcher.fetch(url).await?;
        let samples = match Payload::parse(&body, Utc::now()) {
            Ok(Payload::Batch(samples)) => samples,
            Ok(Payload::Single(sample)) => vec![sample],
            Err(DashboardError::EmptyPayload) => Vec::new(),
            Err(e) => return Err(e),
        };
        info!("[History] {} rows loaded", samples.len());
        Ok(Self::new(samples))
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn filtered(&self) -> &[Sample] {
        &self.filtered
    }

    /// Keep rows captured between `start` 00:00:00 and `end` 23:59:59 (UTC).
    ///
    /// Returns the number of matching rows. When nothing matches the current
    /// selection is left unchanged.
    pub fn filter_by_date(&mut self, start: NaiveDate, end: NaiveDate) -> usize {
        let (Some(from), Some(to)) = (start.and_hms_opt(0, 0, 0), end.and_hms_opt(23, 59, 59))
        else {
            return 0;
        };
        let (from, to) = (from.and_utc(), to.and_utc());
        let result: Vec<Sample> = self
            .all
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp <= to)
            .cloned()
            .collect();
        let matched = result.len();
        if matched > 0 {
            self.filtered = result;
        }
        matched
    }

    /// Case-insensitive substring search over capture time and RTC time.
    pub fn search(&mut self, keyword: &str) -> usize {
        let keyword = keyword.to_lowercase();
        self.filtered = self
            .all
            .iter()
            .filter(|s| {
                let ts = s.timestamp.to_rfc3339().to_lowercase();
                let rtc = s
                    .get(Field::RtcTime)
                    .map(|v| v.to_string().to_lowercase())
                    .unwrap_or_default();
                ts.contains(&keyword) || rtc.contains(&keyword)
            })
            .cloned()
            .collect();
        self.filtered.len()
    }

    pub fn reset(&mut self) {
        self.filtered = self.all.clone();
    }

    pub fn total_pages(&self) -> usize {
        self.filtered.len().div_ceil(ROWS_PER_PAGE)
    }

    /// Page `number` (1-based), clamped into range. `None` when empty.
    pub fn page(&self, number: usize) -> Option<Page<'_>> {
        let total_pages = self.total_pages();
        if total_pages == 0 {
            return None;
        }
        let number = number.clamp(1, total_pages);
        let start = (number - 1) * ROWS_PER_PAGE;
        let end = (start + ROWS_PER_PAGE).min(self.filtered.len());
        Some(Page {
            number,
            total_pages,
            rows: &self.filtered[start..end],
        })
    }

    /// Chronological chart points of the current selection, last `limit`
    /// only (`0` shows everything).
    pub fn chart_data(&self, limit: usize) -> Vec<&Sample> {
        let take = if limit == 0 {
            self.filtered.len()
        } else {
            limit.min(self.filtered.len())
        };
        self.filtered.iter().take(take).rev().collect()
    }

    /// Averages over every loaded row.
    pub fn stats(&self) -> HistoryStats {
        let avg = |field: Field| {
            let values: Vec<f64> = self.all.iter().filter_map(|s| s.number(field)).collect();
            (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
        };
        HistoryStats {
            count: self.all.len(),
            avg_temperature: avg(Field::Temperature),
            avg_humidity: avg(Field::Humidity),
            avg_air_quality: avg(Field::AirQuality),
        }
    }

    /// CSV export of every loaded row.
    pub fn to_csv(&self) -> String {
        to_csv(&self.all)
    }

    /// Capture time of the newest row.
    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.all.first().map(|s| s.timestamp)
    }
}
