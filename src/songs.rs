use actix_web::error::{ErrorInternalServerError, ErrorNotFound};
use actix_web::web::{Data, Json, Query};
use actix_web::{Error, HttpRequest};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::songs::{GetSong, ListSongs, SongLookup};
use crate::pagination::{Page, PageRequest};
use crate::Actors;

pub use crate::db::models::Song;

pub const PAGINATE_BY: i64 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SongList {
    pub query: String,
    pub release_date: Option<NaiveDate>,
    pub page: Page<Song>,
}

/// `GET /hottrack/` and `GET /hottrack/{release_date}/`
///
/// Lists songs, optionally only those released on `release_date` (`YYYY-MM-DD`). `query`
/// matches name, artist or album, ignoring case. Ten songs per page, selected with `page`
/// (a number or `last`); a page out of range is Not Found.
pub async fn index(
    req: HttpRequest,
    params: Query<SearchParams>,
    actors: Data<Actors>,
) -> Result<Json<SongList>, Error> {
    let release_date = match req.match_info().get("release_date") {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ErrorNotFound(format!("Invalid release date {}", raw)))?,
        ),
        None => None,
    };
    let params = params.into_inner();
    let page = PageRequest::parse(params.page.as_deref()).map_err(ErrorNotFound)?;
    let query = params.query.trim().to_string();

    let msg = ListSongs {
        release_date,
        query: query.clone(),
        page,
        paginate_by: PAGINATE_BY,
    };

    let page = actors
        .db
        .send(msg)
        .await
        .map_err(ErrorInternalServerError)??;

    Ok(Json(SongList {
        query,
        release_date,
        page,
    }))
}

/// Picks the lookup from the matched route: `melon_uid` wins over `pk`, `pk` over `slug`.
pub fn song_lookup(req: &HttpRequest) -> Option<SongLookup> {
    let info = req.match_info();

    if let Some(uid) = info.get("melon_uid").filter(|uid| !uid.is_empty()) {
        return Some(SongLookup::MelonUid(uid.to_string()));
    }
    if let Some(pk) = info.get("pk") {
        return pk.parse().ok().map(SongLookup::Pk);
    }

    info.get("slug").map(|slug| SongLookup::Slug(slug.to_string()))
}

/// `GET /hottrack/{pk}/`, `GET /hottrack/melon/{melon_uid}/`, `GET /hottrack/{slug}/`
///
/// Returns one song. Not Found when nothing matches.
pub async fn song_detail(req: HttpRequest, actors: Data<Actors>) -> Result<Json<Song>, Error> {
    let lookup = song_lookup(&req).ok_or_else(|| ErrorNotFound("Song was not found"))?;
    let msg = GetSong {
        lookup,
        release_date: None,
    };

    let song = actors
        .db
        .send(msg)
        .await
        .map_err(ErrorInternalServerError)??;

    Ok(Json(song))
}
