use std::time::Duration;

use actix_web::error::ErrorInternalServerError;
use actix_web::http::StatusCode;
use actix_web::web::{self, Data, Path, Query};
use actix_web::{Error, HttpResponse, ResponseError};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use png::{BitDepth, ColorType, Encoder};
use serde::Deserialize;
use thiserror::Error;

use crate::db::songs::{GetSong, SongLookup};
use crate::utils::PerfLog;
use crate::{Actors, Config};

pub const DEFAULT_SIZE: u32 = 256;
pub const MAX_SIZE: u32 = 512;

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("Invalid size : {0}")]
    InvalidSize(String),
    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),
}

impl ResponseError for CoverError {
    fn status_code(&self) -> StatusCode {
        match self {
            CoverError::InvalidSize(_) => StatusCode::BAD_REQUEST,
            CoverError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            CoverError::InvalidSize(_) => {
                HttpResponse::build(self.status_code()).body(self.to_string())
            }
            CoverError::Encoding(e) => {
                log::error!("{}", e);

                HttpResponse::new(self.status_code())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CoverParams {
    #[serde(default)]
    pub size: Option<String>,
}

/// Requested edge length, `DEFAULT_SIZE` when absent, never above `MAX_SIZE`.
pub fn canvas_size(raw: Option<&str>) -> Result<u32, CoverError> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(DEFAULT_SIZE),
    };

    match raw.trim().parse::<i64>() {
        Ok(size) if size >= 1 => Ok(size.min(i64::from(MAX_SIZE)) as u32),
        _ => Err(CoverError::InvalidSize(raw.to_string())),
    }
}

fn blend(base: Rgba<u8>, tint: Rgba<u8>, amount: f32) -> Rgba<u8> {
    let mix = |a: u8, b: u8| (f32::from(a) * (1.0 - amount) + f32::from(b) * amount).round() as u8;

    Rgba([
        mix(base[0], tint[0]),
        mix(base[1], tint[1]),
        mix(base[2], tint[2]),
        255,
    ])
}

fn gradient(size: u32, top: Rgba<u8>, bottom: Rgba<u8>) -> RgbaImage {
    let last = size.saturating_sub(1).max(1) as f32;

    RgbaImage::from_fn(size, size, |_, y| blend(top, bottom, y as f32 / last))
}

/// Square cover of `canvas_size` pixels.
///
/// `cover` is the downloaded album art in any decodable format; without it the background is
/// a gradient seeded by `artist_name`. A band tinted with the artist colour runs along the
/// bottom edge.
pub fn make_cover_image(cover: Option<&[u8]>, artist_name: &str, canvas_size: u32) -> RgbaImage {
    let seed = blake3::hash(artist_name.as_bytes());
    let seed = seed.as_bytes();
    let accent = Rgba([seed[0], seed[1], seed[2], 255]);
    let shade = Rgba([seed[3] / 2, seed[4] / 2, seed[5] / 2, 255]);

    let art = cover.and_then(|bytes| match image::load_from_memory(bytes) {
        Ok(art) => Some(art),
        Err(e) => {
            log::warn!("Undecodable cover art for {}: {}", artist_name, e);

            None
        }
    });

    let mut canvas = match art {
        Some(art) => art
            .resize_to_fill(canvas_size, canvas_size, FilterType::Triangle)
            .to_rgba8(),
        None => gradient(canvas_size, accent, shade),
    };

    let band = (canvas_size / 5).max(1);
    for y in canvas_size - band..canvas_size {
        for x in 0..canvas_size {
            let pixel = canvas.get_pixel_mut(x, y);
            *pixel = blend(*pixel, accent, 0.6);
        }
    }

    canvas
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CoverError> {
    let mut data = Vec::new();

    {
        let mut encoder = Encoder::new(&mut data, image.width(), image.height());
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.as_raw())?;
        writer.finish()?;
    }

    Ok(data)
}

/// Built once at start-up, cover downloads share its connection pool.
pub fn http_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.cover_fetch_timeout_secs))
        .build()
}

/// Failures only cost the album art, the cover is still rendered.
async fn fetch_cover(client: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
    if url.is_empty() {
        return None;
    }

    let result = async {
        let bytes = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok::<_, reqwest::Error>(bytes.to_vec())
    }
    .await;

    match result {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("Failed to download cover {}: {}", url, e);

            None
        }
    }
}

/// `GET /hottrack/{pk}/cover.png?size=N`
///
/// PNG cover of `N`×`N` pixels (default 256, at most 512). Bad Request when `size` is not a
/// positive integer, Not Found for an unknown song.
pub async fn cover_png(
    pk: Path<i32>,
    params: Query<CoverParams>,
    actors: Data<Actors>,
) -> Result<HttpResponse, Error> {
    let canvas_size = canvas_size(params.size.as_deref())?;

    let msg = GetSong {
        lookup: SongLookup::Pk(pk.into_inner()),
        release_date: None,
    };
    let song = actors
        .db
        .send(msg)
        .await
        .map_err(ErrorInternalServerError)??;

    let art = fetch_cover(&actors.http, &song.cover_url).await;

    let perf = PerfLog::start("cover.png");
    let png = web::block(move || {
        let image = make_cover_image(art.as_deref(), &song.artist_name, canvas_size);

        encode_png(&image)
    })
    .await??;
    perf.finish();

    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}
