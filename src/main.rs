//! # hottrack
//!
//! Read-only HTTP service over a music chart catalog. Every endpoint is documented on its handler
//! function with the method and path in the first line; query parameters are the fields of the
//! `Query<T>` argument. `Data<T>` and `HttpRequest` arguments are server internals.
//!
//! Listing, detail and archive endpoints answer with JSON, the cover endpoint with PNG and the
//! export endpoint with a CSV or XLSX attachment.

use actix::{Addr, SyncArbiter};
use actix_cors::Cors;
use actix_web::{http::Method, middleware, web, App, HttpServer};
use anyhow::Context;
use diesel::prelude::{Connection, SqliteConnection};
use serde::Deserialize;
use std::path::PathBuf;

use crate::archive::ArchiveConfig;
use db::DbExecutor;

pub mod archive;
pub mod cover;
mod db;
pub mod export;
mod init;
pub mod pagination;
pub mod routes;
pub mod songs;
mod utils;

const CONFIG_PATH: &str = "config.toml";

fn default_cover_fetch_timeout_secs() -> u64 {
    5
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    #[serde(default)]
    pub tls_private_key_file: Option<PathBuf>,
    #[serde(default)]
    pub tls_cert_chain_file: Option<PathBuf>,
    #[serde(default)]
    pub tls_bind_addr: Option<String>,
    pub db_path: String,
    pub db_threads: usize,
    /// Enables the `fake-today` override of the today archive.
    #[serde(default)]
    pub debug: bool,
    /// JSON array of songs imported into an empty catalog at start-up.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
    #[serde(default = "default_cover_fetch_timeout_secs")]
    pub cover_fetch_timeout_secs: u64,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

pub struct Actors {
    db: Addr<DbExecutor>,
    http: reqwest::Client,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config: Config = toml::from_str(
        &std::fs::read_to_string(CONFIG_PATH).context("config.toml is missing")?,
    )?;

    let mut connection = SqliteConnection::establish(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path))?;
    init::init(&config, &mut connection).context("Failed to initialize database")?;
    std::mem::drop(connection);

    let database_url = config.db_path.clone();
    let db_addr = SyncArbiter::start(config.db_threads, move || {
        DbExecutor(
            SqliteConnection::establish(&database_url).expect("Failed to open connection to db"),
        )
    });

    let http = cover::http_client(&config).context("Failed to build HTTP client")?;

    let config_data = web::Data::new(config.clone());
    let actors = web::Data::new(Actors { db: db_addr, http });

    #[cfg_attr(not(feature = "tls"), allow(unused_mut))]
    let mut srv_builder = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec![Method::GET]),
            )
            .app_data(config_data.clone())
            .app_data(actors.clone())
            .configure(routes::configure)
    })
    .bind(&config.bind_addr)?;

    // Enable TLS if configured
    #[cfg(feature = "tls")]
    {
        if let (Some(key_path), Some(cert_path), Some(addr)) = (
            &config.tls_private_key_file,
            &config.tls_cert_chain_file,
            &config.tls_bind_addr,
        ) {
            srv_builder = srv_builder.bind_openssl(addr, tls_acceptor(key_path, cert_path)?)?;
        }
    }
    #[cfg(not(feature = "tls"))]
    {
        if config.tls_bind_addr.is_some() {
            log::warn!("tls_bind_addr is set but hottrack was built without the `tls` feature");
        }
    }

    println!("Listening on:");
    for (addr, scheme) in srv_builder.addrs_with_scheme() {
        println!("{}://{}", scheme, addr);
    }

    srv_builder.run().await?;

    Ok(())
}

#[cfg(feature = "tls")]
fn tls_acceptor(
    key_path: &std::path::Path,
    cert_path: &std::path::Path,
) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};

    let mut tls_builder = SslAcceptor::mozilla_intermediate(SslMethod::tls())?;
    tls_builder.set_private_key_file(key_path, SslFiletype::PEM)?;
    tls_builder.set_certificate_chain_file(cert_path)?;

    Ok(tls_builder)
}
