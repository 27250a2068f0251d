use crate::db::models::NewSong;
use crate::db::schema::songs;
use crate::utils::PerfLog;
use crate::Config;
use anyhow::Context;
use diesel::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const CREATE_SONGS: &str = "CREATE TABLE IF NOT EXISTS songs (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    melon_uid TEXT NOT NULL,
    rank INTEGER NOT NULL,
    album_name TEXT NOT NULL,
    name TEXT NOT NULL,
    artist_name TEXT NOT NULL,
    cover_url TEXT NOT NULL DEFAULT '',
    lyrics TEXT NOT NULL DEFAULT '',
    genre TEXT NOT NULL DEFAULT '',
    release_date DATE NOT NULL,
    like_count INTEGER NOT NULL DEFAULT 0,
    slug TEXT NOT NULL DEFAULT ''
);";

const CREATE_INDEXES: [&str; 3] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS songs_melon_uid ON songs (melon_uid);",
    "CREATE INDEX IF NOT EXISTS songs_release_date ON songs (release_date);",
    "CREATE INDEX IF NOT EXISTS songs_slug ON songs (slug);",
];

const INSERT_CHUNK: usize = 100;

pub fn create_schema(conn: &mut SqliteConnection) -> QueryResult<()> {
    diesel::sql_query(CREATE_SONGS).execute(conn)?;
    for statement in CREATE_INDEXES.iter() {
        diesel::sql_query(*statement).execute(conn)?;
    }

    Ok(())
}

/// Text columns are stored NFC so decomposed input stays searchable.
pub fn insert_songs(conn: &mut SqliteConnection, new_songs: &[NewSong]) -> QueryResult<usize> {
    let new_songs: Vec<NewSong> = new_songs.iter().cloned().map(NewSong::into_nfc).collect();

    diesel::insert_into(songs::table)
        .values(&new_songs)
        .execute(conn)
}

/// Creates the schema and, on an empty catalog, imports `seed_file`.
pub fn init(config: &Config, conn: &mut SqliteConnection) -> anyhow::Result<()> {
    use crate::db::schema::songs::dsl::songs;

    create_schema(conn)?;

    let existing: i64 = songs.count().get_result(conn)?;
    if existing > 0 {
        log::info!("Found {} songs in database, skipping seed import.", existing);

        return Ok(());
    }

    let seed_file = match &config.seed_file {
        Some(path) => path,
        None => {
            log::warn!("Song catalog is empty and no seed_file is configured.");

            return Ok(());
        }
    };

    println!(
        "{} Reading {}…",
        console::style("[1/2]").bold(),
        seed_file.display()
    );

    let raw = std::fs::read_to_string(seed_file)
        .with_context(|| format!("failed to read {}", seed_file.display()))?;
    let seed: Vec<NewSong> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of songs", seed_file.display()))?;

    println!(
        "{} Importing {} songs…",
        console::style("[2/2]").bold(),
        seed.len()
    );

    let perf = PerfLog::start("seed import");
    let pb = ProgressBar::new(seed.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(50));

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        for chunk in seed.chunks(INSERT_CHUNK) {
            insert_songs(conn, chunk)?;
            pb.inc(chunk.len() as u64);
        }

        Ok(())
    })
    .context("seed import was rolled back")?;

    pb.finish();
    perf.finish();

    println!("Import completed.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Song;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DITTO: &str = r#"{"melon_uid": "35454426", "rank": 1, "album_name": "Ditto",
        "name": "Ditto", "artist_name": "NewJeans", "release_date": "2022-12-19"}"#;
    const HYPE_BOY: &str = r#"{"melon_uid": "35454425", "rank": 2, "album_name": "New Jeans",
        "name": "Hype Boy", "artist_name": "NewJeans", "release_date": "2022-08-01"}"#;

    fn seed_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[{}]", rows.join(",")).unwrap();

        file
    }

    fn seeded_config(file: &NamedTempFile) -> Config {
        Config {
            seed_file: Some(file.path().to_path_buf()),
            ..crate::testing::config()
        }
    }

    fn row_count(conn: &mut SqliteConnection) -> i64 {
        songs::table.count().get_result(conn).unwrap()
    }

    fn empty_db() -> SqliteConnection {
        SqliteConnection::establish(":memory:").unwrap()
    }

    #[test]
    fn imports_seed_into_empty_catalog() {
        let file = seed_file(&[DITTO, HYPE_BOY]);
        let mut conn = empty_db();

        init(&seeded_config(&file), &mut conn).unwrap();

        let loaded: Vec<Song> = songs::table.order(songs::id).load(&mut conn).unwrap();
        let names: Vec<_> = loaded.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Ditto", "Hype Boy"]);
        assert_eq!(loaded[0].cover_url, "");
        assert_eq!(loaded[0].like_count, 0);
    }

    #[test]
    fn second_run_keeps_existing_catalog() {
        let file = seed_file(&[DITTO]);
        let config = seeded_config(&file);
        let mut conn = empty_db();

        init(&config, &mut conn).unwrap();
        init(&config, &mut conn).unwrap();

        assert_eq!(row_count(&mut conn), 1);
    }

    #[test]
    fn duplicate_melon_uid_rolls_back_whole_import() {
        let file = seed_file(&[HYPE_BOY, DITTO, DITTO]);
        let mut conn = empty_db();

        let err = init(&seeded_config(&file), &mut conn).unwrap_err();

        assert_eq!(err.to_string(), "seed import was rolled back");
        assert_eq!(row_count(&mut conn), 0);
    }

    #[test]
    fn no_seed_file_leaves_empty_schema() {
        let mut conn = empty_db();

        init(&crate::testing::config(), &mut conn).unwrap();

        assert_eq!(row_count(&mut conn), 0);
    }
}
