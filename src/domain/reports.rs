use crate::domain::models::{Task, TaskStatus};
use chrono::{DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RangeType {
    Day,
    Week,
    Month,
}

impl RangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unsupported range type: {}", other)),
        }
    }
}

/// Calendar window for one report. `end` is exclusive: the window covers
/// every instant up to but not including it, which at millisecond
/// resolution matches "through 23:59:59.999".
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRange {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BucketTotal {
    pub label: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportSummary {
    pub range_type: RangeType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buckets: Vec<BucketTotal>,
    pub categories: Vec<CategoryTotal>,
    pub total_hours: f64,
    pub completed_count: usize,
}

const DEFAULT_CATEGORY: &str = "Other";

/// Window boundaries for `reference` in the given timezone.
pub fn report_range(range_type: RangeType, reference: NaiveDate, tz: Tz) -> ReportRange {
    let (start_date, end_date) = match range_type {
        RangeType::Day => (reference, reference + Duration::days(1)),
        RangeType::Week => {
            let offset = i64::from(reference.weekday().number_from_monday()) - 1;
            let monday = reference - Duration::days(offset);
            (monday, monday + Duration::days(7))
        }
        RangeType::Month => {
            let first = reference.with_day(1).expect("day 1 exists in every month");
            let next = first
                .checked_add_months(Months::new(1))
                .unwrap_or(first);
            (first, next)
        }
    };

    ReportRange {
        start: local_midnight(tz, start_date),
        end: local_midnight(tz, end_date),
    }
}

/// Move the reference date by whole range units. Month shifts clamp to the
/// last day of the target month.
pub fn shift_reference(range_type: RangeType, reference: NaiveDate, delta: i32) -> NaiveDate {
    match range_type {
        RangeType::Day => reference + Duration::days(i64::from(delta)),
        RangeType::Week => reference + Duration::days(7 * i64::from(delta)),
        RangeType::Month => {
            let months = Months::new(delta.unsigned_abs());
            if delta >= 0 {
                reference.checked_add_months(months)
            } else {
                reference.checked_sub_months(months)
            }
            .unwrap_or(reference)
        }
    }
}

/// Category is the trimmed title prefix before the first `:`, like
/// "Work: answer mail" -> "Work". Titles without a prefix fall into
/// the default bucket.
pub fn category_of(title: &str) -> &str {
    match title.split_once(':') {
        Some((prefix, _)) if !prefix.trim().is_empty() => prefix.trim(),
        _ => DEFAULT_CATEGORY,
    }
}

/// Bucket completed work inside the window and derive summary stats. Pure
/// function of its inputs: identical arguments always produce an identical
/// summary, so callers re-derive freely on every navigation step.
pub fn summarize(tasks: &[Task], range_type: RangeType, reference: NaiveDate, tz: Tz) -> ReportSummary {
    let range = report_range(range_type, reference, tz);
    let completed: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Completed)
        .filter(|task| task.created_at >= range.start && task.created_at < range.end)
        .collect();

    let mut buckets = empty_buckets(range_type, &range);
    for task in &completed {
        let local = task.created_at.with_timezone(&tz);
        let index = bucket_index(range_type, &local);
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.hours += task.estimated_hours;
        }
    }

    let mut categories: Vec<CategoryTotal> = Vec::new();
    for task in &completed {
        let category = category_of(&task.title);
        match categories.iter_mut().find(|entry| entry.category == category) {
            Some(entry) => entry.hours += task.estimated_hours,
            None => categories.push(CategoryTotal {
                category: category.to_string(),
                hours: task.estimated_hours,
            }),
        }
    }

    let total_hours = completed.iter().map(|task| task.estimated_hours).sum();

    ReportSummary {
        range_type,
        start: range.start.with_timezone(&Utc),
        end: range.end.with_timezone(&Utc),
        buckets,
        categories,
        total_hours,
        completed_count: completed.len(),
    }
}

fn empty_buckets(range_type: RangeType, range: &ReportRange) -> Vec<BucketTotal> {
    let labels: Vec<String> = match range_type {
        RangeType::Day => (0..24).map(|hour| format!("{hour:02}:00")).collect(),
        RangeType::Week => [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .map(|day| weekday_name(day).to_string())
        .collect(),
        RangeType::Month => {
            let days = (range.end.date_naive() - range.start.date_naive()).num_days().max(0);
            (1..=days).map(|day| day.to_string()).collect()
        }
    };

    labels
        .into_iter()
        .map(|label| BucketTotal { label, hours: 0.0 })
        .collect()
}

fn bucket_index(range_type: RangeType, local: &DateTime<Tz>) -> usize {
    match range_type {
        RangeType::Day => local.hour() as usize,
        RangeType::Week => local.weekday().number_from_monday() as usize - 1,
        RangeType::Month => local.day() as usize - 1,
    }
}

fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_hms_opt(0, 0, 0).expect("valid midnight");
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Midnight erased by a DST gap.
        LocalResult::None => tz.from_utc_datetime(&naive),
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
