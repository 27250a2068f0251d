use actix_web::error::ErrorInternalServerError;
use actix_web::http::{header, StatusCode};
use actix_web::web::{Data, Path};
use actix_web::{Error, HttpResponse, ResponseError};
use rust_xlsxwriter::{Workbook, XlsxError};
use thiserror::Error;

use crate::db::songs::GetAllSongs;
use crate::songs::Song;
use crate::utils::PerfLog;
use crate::Actors;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid format : {0}")]
    InvalidFormat(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XLSX error: {0}")]
    Xlsx(#[from] XlsxError),
}

impl ResponseError for ExportError {
    fn status_code(&self) -> StatusCode {
        match self {
            ExportError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ExportError::InvalidFormat(_) => {
                HttpResponse::build(self.status_code()).body(self.to_string())
            }
            e => {
                log::error!("{}", e);

                HttpResponse::new(self.status_code())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Xlsx,
}

impl Format {
    pub fn parse(raw: &str) -> Result<Self, ExportError> {
        match raw {
            "csv" => Ok(Format::Csv),
            "xlsx" => Ok(Format::Xlsx),
            _ => Err(ExportError::InvalidFormat(raw.to_string())),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Format::Csv => "text/csv",
            Format::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            Format::Csv => "hottrack.csv",
            Format::Xlsx => "hottrack.xlsx",
        }
    }

    pub fn render(self, songs: &[Song]) -> Result<Vec<u8>, ExportError> {
        match self {
            Format::Csv => to_csv(songs),
            Format::Xlsx => to_xlsx(songs),
        }
    }
}

/// UTF-8 with a byte-order mark so spreadsheet programs do not guess a legacy encoding.
pub fn to_csv(songs: &[Song]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());

    if songs.is_empty() {
        writer.write_record(Song::COLUMNS)?;
    }
    for song in songs {
        writer.serialize(song)?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}

/// Single sheet, header row then one row per song.
pub fn to_xlsx(songs: &[Song]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in Song::COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }

    for (i, song) in songs.iter().enumerate() {
        let row = i as u32 + 1;

        worksheet.write_number(row, 0, song.id)?;
        worksheet.write_string(row, 1, &song.melon_uid)?;
        worksheet.write_number(row, 2, song.rank)?;
        worksheet.write_string(row, 3, &song.album_name)?;
        worksheet.write_string(row, 4, &song.name)?;
        worksheet.write_string(row, 5, &song.artist_name)?;
        worksheet.write_string(row, 6, &song.cover_url)?;
        worksheet.write_string(row, 7, &song.lyrics)?;
        worksheet.write_string(row, 8, &song.genre)?;
        worksheet.write_string(row, 9, song.release_date.format("%Y-%m-%d").to_string())?;
        worksheet.write_number(row, 10, song.like_count)?;
        worksheet.write_string(row, 11, &song.slug)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// `GET /hottrack/export.{format}`
///
/// Downloads the whole catalog as `csv` or `xlsx`. Any other format is Bad Request.
pub async fn export(format: Path<String>, actors: Data<Actors>) -> Result<HttpResponse, Error> {
    let format = Format::parse(&format)?;

    let songs = actors
        .db
        .send(GetAllSongs)
        .await
        .map_err(ErrorInternalServerError)??;

    let perf = PerfLog::start(format.filename());
    let body = format.render(&songs)?;
    perf.finish();

    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename*=utf-8''{}", format.filename()),
        ))
        .body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, App};
    use calamine::{Reader, Xlsx};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use crate::db::songs::get_song;
    use crate::db::songs::{GetSong, SongLookup};
    use crate::db::testing;
    use crate::routes;

    fn all_songs() -> Vec<Song> {
        let mut conn = testing::connection();

        (1..=testing::sample_songs().len() as i32)
            .map(|pk| {
                get_song(
                    &mut conn,
                    &GetSong {
                        lookup: SongLookup::Pk(pk),
                        release_date: None,
                    },
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn format_names() {
        assert_eq!(Format::parse("csv").unwrap(), Format::Csv);
        assert_eq!(Format::parse("xlsx").unwrap(), Format::Xlsx);
        assert_eq!(
            Format::parse("pdf").unwrap_err().to_string(),
            "Invalid format : pdf"
        );
    }

    #[test]
    fn csv_round_trip() {
        let songs = all_songs();
        let data = to_csv(&songs).unwrap();

        assert!(data.starts_with(UTF8_BOM));

        let mut reader = csv::Reader::from_reader(&data[UTF8_BOM.len()..]);
        assert_eq!(reader.headers().unwrap(), Song::COLUMNS.as_slice());

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), songs.len());
        for (row, song) in rows.iter().zip(&songs) {
            assert_eq!(row[0].parse::<i32>().unwrap(), song.id);
            assert_eq!(&row[4], song.name);
            assert_eq!(&row[5], song.artist_name);
            assert_eq!(&row[9], song.release_date.to_string());
        }
    }

    #[test]
    fn empty_csv_keeps_header() {
        let data = to_csv(&[]).unwrap();
        let mut reader = csv::Reader::from_reader(&data[UTF8_BOM.len()..]);

        assert_eq!(reader.headers().unwrap().len(), Song::COLUMNS.len());
        assert_eq!(reader.records().count(), 0);
    }

    #[test]
    fn xlsx_round_trip() {
        let songs = all_songs();
        let data = to_xlsx(&songs).unwrap();

        let mut workbook = Xlsx::new(Cursor::new(data)).unwrap();
        let range = workbook.worksheet_range("Sheet1").unwrap();

        assert_eq!(range.height(), songs.len() + 1);
        assert_eq!(range.width(), Song::COLUMNS.len());

        let mut rows = range.rows();
        let header: Vec<String> = rows.next().unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(header, Song::COLUMNS);

        for (row, song) in rows.zip(&songs) {
            assert_eq!(row[4].to_string(), song.name);
            assert_eq!(row[5].to_string(), song.artist_name);
            assert_eq!(row[9].to_string(), song.release_date.to_string());
            assert_eq!(row[2].to_string(), song.rank.to_string());
        }
    }

    #[actix_web::test]
    async fn export_endpoint() {
        let (config, actors) = crate::testing::app_data(crate::testing::config());
        let app = actix_test::init_service(
            App::new()
                .app_data(config)
                .app_data(actors)
                .configure(routes::configure),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/hottrack/export.csv")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "text/csv");
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename*=utf-8''hottrack.csv"
        );
        let body = actix_test::read_body(resp).await;
        assert!(body.starts_with(UTF8_BOM));

        let req = actix_test::TestRequest::get()
            .uri("/hottrack/export.xlsx")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            Format::Xlsx.content_type()
        );

        let req = actix_test::TestRequest::get()
            .uri("/hottrack/export.pdf")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(actix_test::read_body(resp).await, "Invalid format : pdf");
    }
}
