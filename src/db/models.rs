use super::schema::songs;
use chrono::NaiveDate;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Column order matches `schema::songs`, exports rely on it for the header row.
#[derive(Clone, Queryable, Debug, PartialEq, Serialize)]
pub struct Song {
    pub id: i32,
    pub melon_uid: String,
    pub rank: i32,
    pub album_name: String,
    pub name: String,
    pub artist_name: String,
    pub cover_url: String,
    pub lyrics: String,
    pub genre: String,
    /// `YYYY-MM-DD`
    pub release_date: NaiveDate,
    pub like_count: i32,
    pub slug: String,
}

impl Song {
    pub const COLUMNS: [&'static str; 12] = [
        "id",
        "melon_uid",
        "rank",
        "album_name",
        "name",
        "artist_name",
        "cover_url",
        "lyrics",
        "genre",
        "release_date",
        "like_count",
        "slug",
    ];
}

/// Row format of the seed file.
#[derive(Clone, Insertable, Debug, Deserialize)]
#[diesel(table_name = songs)]
pub struct NewSong {
    pub melon_uid: String,
    pub rank: i32,
    pub album_name: String,
    pub name: String,
    pub artist_name: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub lyrics: String,
    #[serde(default)]
    pub genre: String,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub like_count: i32,
    #[serde(default)]
    pub slug: String,
}

impl NewSong {
    /// Searchable text in composed form, the form search terms are normalised to.
    pub fn into_nfc(self) -> Self {
        NewSong {
            album_name: self.album_name.nfc().collect(),
            name: self.name.nfc().collect(),
            artist_name: self.artist_name.nfc().collect(),
            ..self
        }
    }
}
