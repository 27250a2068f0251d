//! Date-based browsing of the catalog by `release_date`.
//!
//! Every period parameter (`year`, `month`, `day`, `week`) is looked up in three places, first
//! match wins:
//!
//! 1. the fixed value from the `[archive]` table of `config.toml`,
//! 2. the value captured from the URL path,
//! 3. the query parameter of the same name.
//!
//! Songs released after today are never listed, and a period without songs is Not Found.

use std::collections::{BTreeSet, HashMap};
use std::ops::RangeInclusive;
use std::str::FromStr;

use actix::MailboxError;
use actix_web::http::StatusCode;
use actix_web::web::{Data, Json, Query};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use chrono::{Datelike, Days, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::archive::{GetDatedPage, GetDatedSongs};
use crate::db::songs::{self as db_songs, GetSong, SongLookup};
use crate::pagination::{Page, PageError, PageRequest, PAGE_PARAM};
use crate::songs::Song;
use crate::{Actors, Config};

pub const INDEX_PAGINATE_BY: i64 = 10;
pub const FAKE_TODAY_PARAM: &str = "fake-today";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Year,
    Month,
    Week,
    Day,
}

impl Period {
    /// First day of the period containing `date`. Weeks start on Monday.
    pub fn start_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Year => date.with_ordinal(1).unwrap_or(date),
            Period::Month => date.with_day(1).unwrap_or(date),
            Period::Week => date
                .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
                .unwrap_or(date),
            Period::Day => date,
        }
    }

    /// First day of the period after the one starting at `start`.
    pub fn following(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Year => NaiveDate::from_ymd_opt(start.year() + 1, 1, 1),
            Period::Month => start.checked_add_months(Months::new(1)),
            Period::Week => start.checked_add_days(Days::new(7)),
            Period::Day => start.succ_opt(),
        }
    }
}

impl FromStr for Period {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(Period::Year),
            "month" => Ok(Period::Month),
            "week" => Ok(Period::Week),
            "day" => Ok(Period::Day),
            _ => Err(ArchiveError::InvalidPeriod(s.to_string())),
        }
    }
}

/// Fixed period values, the first tier of the lookup.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub date_list_period: Option<Period>,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("No {0} specified")]
    NotSpecified(&'static str),
    #[error("Invalid {0} '{1}'")]
    InvalidDate(&'static str, String),
    #[error("Invalid date list period '{0}'")]
    InvalidPeriod(String),
    #[error("Future songs not available")]
    Future,
    #[error("No songs available")]
    Empty,
    #[error("{0}")]
    InvalidPage(#[from] PageError),
    #[error(transparent)]
    Db(#[from] db_songs::Error),
    #[error("Database executor unavailable: {0}")]
    Mailbox(#[from] MailboxError),
}

impl ResponseError for ArchiveError {
    fn status_code(&self) -> StatusCode {
        match self {
            ArchiveError::Db(e) => e.status_code(),
            ArchiveError::Mailbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ArchiveError::Db(e) => e.error_response(),
            ArchiveError::Mailbox(e) => {
                log::error!("{}", e);

                HttpResponse::new(self.status_code())
            }
            _ => HttpResponse::build(self.status_code()).body(self.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DatedArchive {
    pub period: Period,
    /// First day of the browsed period.
    pub date: NaiveDate,
    pub previous: Option<NaiveDate>,
    pub next: Option<NaiveDate>,
    pub date_list_period: Option<Period>,
    pub date_list: Vec<NaiveDate>,
    pub object_list: Vec<Song>,
}

#[derive(Debug, Serialize)]
pub struct ArchiveIndex {
    pub date_list_period: Period,
    pub date_list: Vec<NaiveDate>,
    pub page: Page<Song>,
}

fn query_param(req: &HttpRequest, name: &str) -> Option<String> {
    Query::<HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|params| params.get(name).cloned())
}

/// Resolves a period parameter: fixed value, then URL path, then query string.
pub fn lookup(name: &str, fixed: Option<String>, req: &HttpRequest) -> Option<String> {
    fixed
        .or_else(|| req.match_info().get(name).map(str::to_string))
        .or_else(|| query_param(req, name))
}

/// Resolves `name` and parses it as `digits` ASCII digits, `2023` for a year and `7` or `07`
/// for the others.
fn required<T: FromStr>(
    name: &'static str,
    fixed: Option<String>,
    req: &HttpRequest,
    digits: RangeInclusive<usize>,
) -> Result<T, ArchiveError> {
    let raw = lookup(name, fixed, req).ok_or(ArchiveError::NotSpecified(name))?;

    if !digits.contains(&raw.len()) || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ArchiveError::InvalidDate(name, raw));
    }

    raw.parse().map_err(|_| ArchiveError::InvalidDate(name, raw))
}

fn year(req: &HttpRequest, config: &ArchiveConfig) -> Result<i32, ArchiveError> {
    let fixed = config.year.map(|y| format!("{:04}", y));
    let year: i32 = required("year", fixed, req, 4..=4)?;

    if year < 1 {
        return Err(ArchiveError::InvalidDate("year", year.to_string()));
    }

    Ok(year)
}

fn month_start(req: &HttpRequest, config: &ArchiveConfig) -> Result<NaiveDate, ArchiveError> {
    let year = year(req, config)?;
    let month: u32 = required("month", config.month.map(|m| m.to_string()), req, 1..=2)?;

    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ArchiveError::InvalidDate("month", month.to_string()))
}

fn day(req: &HttpRequest, config: &ArchiveConfig) -> Result<NaiveDate, ArchiveError> {
    let month = month_start(req, config)?;
    let day: u32 = required("day", config.day.map(|d| d.to_string()), req, 1..=2)?;

    month
        .with_day(day)
        .ok_or_else(|| ArchiveError::InvalidDate("day", day.to_string()))
}

/// Monday of week `week` of `year`, counting weeks the `%W` way: week 1 starts on the first
/// Monday of the year and the days before it belong to week 0.
pub fn week_start(year: i32, week: u32) -> Option<NaiveDate> {
    if week > 53 {
        return None;
    }

    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let first_weekday = i64::from(jan1.weekday().num_days_from_monday());
    let offset = if week == 0 {
        -first_weekday
    } else {
        (7 - first_weekday) % 7 + 7 * (i64::from(week) - 1)
    };

    jan1.checked_add_signed(chrono::Duration::days(offset))
}

fn week(req: &HttpRequest, config: &ArchiveConfig) -> Result<NaiveDate, ArchiveError> {
    let year = year(req, config)?;
    let week: u32 = required("week", config.week.map(|w| w.to_string()), req, 1..=2)?;

    week_start(year, week).ok_or_else(|| ArchiveError::InvalidDate("week", week.to_string()))
}

/// Parses `YYYY-M-D`. Anything else yields `None`.
pub fn parse_fake_today(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.splitn(4, '-').collect();
    if parts.len() != 3 {
        return None;
    }

    let year = parts[0].parse().ok()?;
    let month = parts[1].parse().ok()?;
    let day = parts[2].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn distinct_periods(dates: &[NaiveDate], period: Period) -> BTreeSet<NaiveDate> {
    dates.iter().map(|d| period.start_of(*d)).collect()
}

async fn dated_archive(
    actors: &Actors,
    today: NaiveDate,
    period: Period,
    since: NaiveDate,
    date_list_period: Option<Period>,
) -> Result<Json<DatedArchive>, ArchiveError> {
    let until = period
        .following(since)
        .ok_or_else(|| ArchiveError::InvalidDate("date", since.to_string()))?;

    let msg = GetDatedSongs {
        since,
        until,
        today,
    };
    let dated = actors.db.send(msg).await??;

    if dated.songs.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let date_list: Vec<NaiveDate> = date_list_period
        .map(|p| distinct_periods(&dated.release_dates, p).into_iter().collect())
        .unwrap_or_default();

    Ok(Json(DatedArchive {
        period,
        date: since,
        previous: dated.previous.map(|d| period.start_of(d)),
        next: dated.next.map(|d| period.start_of(d)),
        date_list_period,
        date_list,
        object_list: dated.songs,
    }))
}

/// `GET /hottrack/archive/{year}/`, `GET /hottrack/archive/year/?year=`
///
/// Songs of one year with the months that have releases.
pub async fn year_archive(
    req: HttpRequest,
    actors: Data<Actors>,
    config: Data<Config>,
) -> Result<Json<DatedArchive>, ArchiveError> {
    let year = year(&req, &config.archive)?;
    let since = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ArchiveError::InvalidDate("year", year.to_string()))?;

    dated_archive(&actors, local_today(), Period::Year, since, Some(Period::Month)).await
}

/// `GET /hottrack/archive/{year}/{month}/`, `GET /hottrack/archive/month/?year=&month=`
///
/// Songs of one month with the days that have releases.
pub async fn month_archive(
    req: HttpRequest,
    actors: Data<Actors>,
    config: Data<Config>,
) -> Result<Json<DatedArchive>, ArchiveError> {
    let since = month_start(&req, &config.archive)?;

    dated_archive(&actors, local_today(), Period::Month, since, Some(Period::Day)).await
}

/// `GET /hottrack/archive/{year}/{month}/{day}/`, `GET /hottrack/archive/day/?year=&month=&day=`
pub async fn day_archive(
    req: HttpRequest,
    actors: Data<Actors>,
    config: Data<Config>,
) -> Result<Json<DatedArchive>, ArchiveError> {
    let since = day(&req, &config.archive)?;

    dated_archive(&actors, local_today(), Period::Day, since, None).await
}

/// `GET /hottrack/archive/{year}/week/{week}/`, `GET /hottrack/archive/week/?year=&week=`
///
/// Weeks start on Monday.
pub async fn week_archive(
    req: HttpRequest,
    actors: Data<Actors>,
    config: Data<Config>,
) -> Result<Json<DatedArchive>, ArchiveError> {
    let since = week(&req, &config.archive)?;

    dated_archive(&actors, local_today(), Period::Week, since, None).await
}

/// `GET /hottrack/archive/today/`
///
/// Songs released today. With `debug = true` the day can be replaced with
/// `?fake-today=YYYY-M-D`; a malformed value is ignored.
pub async fn today_archive(
    req: HttpRequest,
    actors: Data<Actors>,
    config: Data<Config>,
) -> Result<Json<DatedArchive>, ArchiveError> {
    let today = local_today();
    let day = if config.debug {
        query_param(&req, FAKE_TODAY_PARAM)
            .and_then(|raw| parse_fake_today(&raw))
            .unwrap_or(today)
    } else {
        today
    };

    dated_archive(&actors, today, Period::Day, day, None).await
}

/// `GET /hottrack/archive/`, `GET /hottrack/archive/index/{date_list_period}/`
///
/// Every song up to today, newest first, ten per page. `date_list` holds the periods
/// (`year` unless the URL or config says otherwise) that have releases, newest first.
pub async fn archive_index(
    req: HttpRequest,
    actors: Data<Actors>,
    config: Data<Config>,
) -> Result<Json<ArchiveIndex>, ArchiveError> {
    let date_list_period = match req.match_info().get("date_list_period") {
        Some(raw) => raw.parse()?,
        None => config.archive.date_list_period.unwrap_or(Period::Year),
    };
    let page = PageRequest::parse(query_param(&req, PAGE_PARAM).as_deref())?;

    let msg = GetDatedPage {
        today: local_today(),
        paginate_by: INDEX_PAGINATE_BY,
        page,
    };
    let dated = actors.db.send(msg).await??;

    let date_list: Vec<_> = distinct_periods(&dated.release_dates, date_list_period)
        .into_iter()
        .rev()
        .collect();
    if date_list.is_empty() {
        return Err(ArchiveError::Empty);
    }

    Ok(Json(ArchiveIndex {
        date_list_period,
        date_list,
        page: dated.page,
    }))
}

/// `GET /hottrack/archive/{year}/{month}/{day}/{pk}/`, `GET /hottrack/archive/{year}/{month}/{day}/{slug}/`
///
/// One song, only if it was released on that day and the day is not in the future.
pub async fn song_date_detail(
    req: HttpRequest,
    actors: Data<Actors>,
    config: Data<Config>,
) -> Result<Json<Song>, ArchiveError> {
    let date = day(&req, &config.archive)?;
    if date > local_today() {
        return Err(ArchiveError::Future);
    }

    let info = req.match_info();
    let lookup = match (info.get("pk"), info.get("slug")) {
        (Some(pk), _) => pk.parse().map(SongLookup::Pk).ok(),
        (None, Some(slug)) => Some(SongLookup::Slug(slug.to_string())),
        (None, None) => None,
    }
    .ok_or(ArchiveError::Db(db_songs::Error::NotFound))?;

    let msg = GetSong {
        lookup,
        release_date: Some(date),
    };

    Ok(Json(actors.db.send(msg).await??))
}
