use actix::prelude::*;
use diesel::sqlite::SqliteConnection;

pub mod archive;
pub mod models;
pub mod schema;
pub mod songs;

pub struct DbExecutor(pub SqliteConnection);

impl Actor for DbExecutor {
    type Context = SyncContext<Self>;
}

#[cfg(test)]
pub mod testing {
    use actix::{Addr, SyncArbiter};
    use chrono::NaiveDate;
    use diesel::{Connection, SqliteConnection};

    use super::models::NewSong;
    use super::DbExecutor;
    use crate::init;

    fn song(
        melon_uid: &str,
        rank: i32,
        name: &str,
        artist_name: &str,
        album_name: &str,
        release_date: (i32, u32, u32),
    ) -> NewSong {
        let (y, m, d) = release_date;

        NewSong {
            melon_uid: melon_uid.to_string(),
            rank,
            album_name: album_name.to_string(),
            name: name.to_string(),
            artist_name: artist_name.to_string(),
            cover_url: String::new(),
            lyrics: String::new(),
            genre: "댄스".to_string(),
            release_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            like_count: 1000 - rank,
            slug: name.to_lowercase().replace(' ', "-"),
        }
    }

    /// Ids follow insertion order, starting at 1.
    pub fn sample_songs() -> Vec<NewSong> {
        vec![
            song("35454426", 1, "Ditto", "NewJeans", "Ditto", (2022, 12, 19)),
            song("35454425", 2, "Hype Boy", "NewJeans", "NewJeans 1st EP 'New Jeans'", (2022, 8, 1)),
            song("34657844", 3, "사건의 지평선", "윤하", "END THEORY : Final Edition", (2022, 3, 30)),
            song("35770032", 4, "Antifragile", "LE SSERAFIM", "ANTIFRAGILE", (2022, 10, 17)),
            song("36596487", 5, "Super Shy", "NewJeans", "NewJeans 2nd EP 'Get Up'", (2023, 7, 7)),
            song("36617842", 6, "Seven (feat. Latto)", "정국", "Seven", (2023, 7, 14)),
            song("36382580", 7, "I AM", "IVE", "I've IVE", (2023, 4, 10)),
            song("36420134", 8, "Queencard", "(여자)아이들", "I feel", (2023, 5, 15)),
            song("99999999", 9, "100% Tomorrow", "Time Traveler", "Future_Tense", (2999, 1, 1)),
        ]
    }

    pub fn connection() -> SqliteConnection {
        let mut connection = SqliteConnection::establish(":memory:").unwrap();
        init::create_schema(&mut connection).unwrap();
        init::insert_songs(&mut connection, &sample_songs()).unwrap();

        connection
    }

    /// One executor thread keeps the whole in-memory database on a single connection.
    pub fn executor() -> Addr<DbExecutor> {
        SyncArbiter::start(1, || DbExecutor(connection()))
    }
}
