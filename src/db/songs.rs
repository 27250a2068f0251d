use actix::prelude::*;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::db::models::Song;
use crate::db::schema::songs;
use crate::db::DbExecutor;
use crate::pagination::{Page, PageError, PageRequest, PageWindow};

/// Search over the whole catalog. Empty `query` disables the text filter.
pub struct ListSongs {
    pub release_date: Option<NaiveDate>,
    pub query: String,
    pub page: PageRequest,
    pub paginate_by: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongLookup {
    Pk(i32),
    MelonUid(String),
    Slug(String),
}

pub struct GetSong {
    pub lookup: SongLookup,
    /// Restricts the match to songs released on this day.
    pub release_date: Option<NaiveDate>,
}

pub struct GetAllSongs;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Song was not found")]
    NotFound,
    #[error("{0}")]
    InvalidPage(#[from] PageError),
    #[error("Database error: {0}")]
    DbError(#[from] diesel::result::Error),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound | Error::InvalidPage(_) => StatusCode::NOT_FOUND,
            Error::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Error::DbError(e) => {
                log::error!("{}", e);

                HttpResponse::new(self.status_code())
            }
            _ => HttpResponse::build(self.status_code()).body(self.to_string()),
        }
    }
}

/// Turns a search term into a `LIKE` pattern that matches it literally anywhere.
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.nfc() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    pattern
}

fn search_query<'a>(
    release_date: Option<NaiveDate>,
    query: &str,
) -> songs::BoxedQuery<'a, Sqlite> {
    let mut boxed = songs::table.into_boxed();

    if let Some(date) = release_date {
        boxed = boxed.filter(songs::release_date.eq(date));
    }

    let query = query.trim();
    if !query.is_empty() {
        let pattern = like_pattern(query);
        boxed = boxed.filter(
            songs::name
                .like(pattern.clone())
                .escape('\\')
                .or(songs::artist_name.like(pattern.clone()).escape('\\'))
                .or(songs::album_name.like(pattern).escape('\\')),
        );
    }

    boxed
}

pub fn list_songs(conn: &mut SqliteConnection, msg: &ListSongs) -> Result<Page<Song>, Error> {
    let count: i64 = search_query(msg.release_date, &msg.query)
        .count()
        .get_result(conn)?;
    let window = PageWindow::resolve(msg.page, count, msg.paginate_by)?;

    let entries = search_query(msg.release_date, &msg.query)
        .order(songs::id.asc())
        .offset(window.offset)
        .limit(window.limit)
        .load::<Song>(conn)?;

    Ok(window.into_page(entries))
}

pub fn get_song(conn: &mut SqliteConnection, msg: &GetSong) -> Result<Song, Error> {
    let mut query = songs::table.into_boxed();

    query = match &msg.lookup {
        SongLookup::Pk(pk) => query.filter(songs::id.eq(*pk)),
        SongLookup::MelonUid(uid) => query.filter(songs::melon_uid.eq(uid.clone())),
        SongLookup::Slug(slug) => query.filter(songs::slug.eq(slug.clone())),
    };

    if let Some(date) = msg.release_date {
        query = query.filter(songs::release_date.eq(date));
    }

    query
        .order(songs::id.asc())
        .first::<Song>(conn)
        .optional()?
        .ok_or(Error::NotFound)
}

impl Message for ListSongs {
    type Result = Result<Page<Song>, Error>;
}

impl Handler<ListSongs> for DbExecutor {
    type Result = Result<Page<Song>, Error>;

    fn handle(&mut self, msg: ListSongs, _: &mut Self::Context) -> Self::Result {
        list_songs(&mut self.0, &msg)
    }
}

impl Message for GetSong {
    type Result = Result<Song, Error>;
}

impl Handler<GetSong> for DbExecutor {
    type Result = Result<Song, Error>;

    fn handle(&mut self, msg: GetSong, _: &mut Self::Context) -> Self::Result {
        get_song(&mut self.0, &msg)
    }
}

impl Message for GetAllSongs {
    type Result = Result<Vec<Song>, Error>;
}

impl Handler<GetAllSongs> for DbExecutor {
    type Result = Result<Vec<Song>, Error>;

    fn handle(&mut self, _msg: GetAllSongs, _: &mut Self::Context) -> Self::Result {
        use super::schema::songs::dsl::{id, songs};

        Ok(songs.order(id.asc()).load(&mut self.0)?)
    }
}
