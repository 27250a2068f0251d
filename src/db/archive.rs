use actix::prelude::*;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::db::models::Song;
use crate::db::schema::songs;
use crate::db::songs::Error;
use crate::db::DbExecutor;
use crate::pagination::{Page, PageRequest, PageWindow};

/// Songs released in `since..until`, never after `today`.
#[derive(Debug, Clone)]
pub struct GetDatedSongs {
    pub since: NaiveDate,
    pub until: NaiveDate,
    pub today: NaiveDate,
}

#[derive(Debug)]
pub struct DatedSongs {
    /// Newest first.
    pub songs: Vec<Song>,
    /// Distinct release dates in range, oldest first.
    pub release_dates: Vec<NaiveDate>,
    /// Latest release date before `since`.
    pub previous: Option<NaiveDate>,
    /// Earliest release date from `until` on, up to `today`.
    pub next: Option<NaiveDate>,
}

/// Every song up to `today`, newest first, one page at a time.
#[derive(Debug, Clone)]
pub struct GetDatedPage {
    pub today: NaiveDate,
    pub paginate_by: i64,
    pub page: PageRequest,
}

#[derive(Debug)]
pub struct DatedPage {
    pub page: Page<Song>,
    /// Distinct release dates up to `today`, oldest first.
    pub release_dates: Vec<NaiveDate>,
}

fn released_by<'a>(today: NaiveDate) -> songs::BoxedQuery<'a, Sqlite> {
    songs::table
        .filter(songs::release_date.le(today))
        .into_boxed()
}

fn in_range<'a>(msg: &GetDatedSongs) -> songs::BoxedQuery<'a, Sqlite> {
    released_by(msg.today)
        .filter(songs::release_date.ge(msg.since))
        .filter(songs::release_date.lt(msg.until))
}

fn distinct_release_dates(
    query: songs::BoxedQuery<'_, Sqlite>,
    conn: &mut SqliteConnection,
) -> QueryResult<Vec<NaiveDate>> {
    query
        .select(songs::release_date)
        .distinct()
        .order(songs::release_date.asc())
        .load(conn)
}

pub fn dated_songs(conn: &mut SqliteConnection, msg: &GetDatedSongs) -> Result<DatedSongs, Error> {
    let release_dates = distinct_release_dates(in_range(msg), conn)?;
    let songs = in_range(msg)
        .order((songs::release_date.desc(), songs::id.asc()))
        .load::<Song>(conn)?;

    let previous = released_by(msg.today)
        .select(songs::release_date)
        .filter(songs::release_date.lt(msg.since))
        .order(songs::release_date.desc())
        .first::<NaiveDate>(conn)
        .optional()?;

    let next = released_by(msg.today)
        .select(songs::release_date)
        .filter(songs::release_date.ge(msg.until))
        .order(songs::release_date.asc())
        .first::<NaiveDate>(conn)
        .optional()?;

    Ok(DatedSongs {
        songs,
        release_dates,
        previous,
        next,
    })
}

pub fn dated_page(conn: &mut SqliteConnection, msg: &GetDatedPage) -> Result<DatedPage, Error> {
    let release_dates = distinct_release_dates(released_by(msg.today), conn)?;

    let count: i64 = released_by(msg.today).count().get_result(conn)?;
    let window = PageWindow::resolve(msg.page, count, msg.paginate_by)?;
    let songs = released_by(msg.today)
        .order((songs::release_date.desc(), songs::id.asc()))
        .offset(window.offset)
        .limit(window.limit)
        .load::<Song>(conn)?;

    Ok(DatedPage {
        page: window.into_page(songs),
        release_dates,
    })
}

impl Message for GetDatedSongs {
    type Result = Result<DatedSongs, Error>;
}

impl Handler<GetDatedSongs> for DbExecutor {
    type Result = Result<DatedSongs, Error>;

    fn handle(&mut self, msg: GetDatedSongs, _: &mut Self::Context) -> Self::Result {
        dated_songs(&mut self.0, &msg)
    }
}

impl Message for GetDatedPage {
    type Result = Result<DatedPage, Error>;
}

impl Handler<GetDatedPage> for DbExecutor {
    type Result = Result<DatedPage, Error>;

    fn handle(&mut self, msg: GetDatedPage, _: &mut Self::Context) -> Self::Result {
        dated_page(&mut self.0, &msg)
    }
}
