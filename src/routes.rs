use actix_web::web;

pub use crate::archive::{
    archive_index, day_archive, month_archive, song_date_detail, today_archive, week_archive,
    year_archive,
};
pub use crate::cover::cover_png;
pub use crate::export::export;
pub use crate::songs::{index, song_detail};

/// Registration order matters: `/{slug}/` would swallow the fixed segments above it.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/hottrack")
            .route("/", web::get().to(index))
            .route(
                "/{release_date:[0-9]+-[0-9]+-[0-9]+}/",
                web::get().to(index),
            )
            .route("/export.{format}", web::get().to(export))
            .route("/melon/{melon_uid}/", web::get().to(song_detail))
            .route("/{pk:[0-9]+}/", web::get().to(song_detail))
            .route("/{pk:[0-9]+}/cover.png", web::get().to(cover_png))
            .route("/archive/", web::get().to(archive_index))
            .route(
                "/archive/index/{date_list_period}/",
                web::get().to(archive_index),
            )
            .route("/archive/today/", web::get().to(today_archive))
            .route("/archive/year/", web::get().to(year_archive))
            .route("/archive/month/", web::get().to(month_archive))
            .route("/archive/day/", web::get().to(day_archive))
            .route("/archive/week/", web::get().to(week_archive))
            .route("/archive/{year:[0-9]+}/", web::get().to(year_archive))
            .route(
                "/archive/{year:[0-9]+}/week/{week:[0-9]+}/",
                web::get().to(week_archive),
            )
            .route(
                "/archive/{year:[0-9]+}/{month:[0-9]+}/",
                web::get().to(month_archive),
            )
            .route(
                "/archive/{year:[0-9]+}/{month:[0-9]+}/{day:[0-9]+}/",
                web::get().to(day_archive),
            )
            .route(
                "/archive/{year:[0-9]+}/{month:[0-9]+}/{day:[0-9]+}/{pk:[0-9]+}/",
                web::get().to(song_date_detail),
            )
            .route(
                "/archive/{year:[0-9]+}/{month:[0-9]+}/{day:[0-9]+}/{slug}/",
                web::get().to(song_date_detail),
            )
            .route("/{slug}/", web::get().to(song_detail)),
    );
}
