use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::{io, sync::Arc};
use tracing_subscriber::EnvFilter;

use splitzz::mongo::MongoStore;
use splitzz::routes::{self, AppState};
use splitzz::settings::{DatabaseKind, Settings};
use splitzz::store::{GroupStore, MemoryStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let settings = Settings::new().map_err(io::Error::other)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "splitzz={level},actix_web={level}",
            level = settings.log.level
        )))
        .init();

    let store: Arc<dyn GroupStore> = match settings.database.kind {
        DatabaseKind::Memory => {
            tracing::warn!("using the in-memory store, groups are lost on restart");
            Arc::new(MemoryStore::default())
        }
        DatabaseKind::Mongodb => {
            let uri = settings.mongodb_uri().map_err(io::Error::other)?;
            tracing::info!(database = %settings.database.name, "using MongoDB");
            Arc::new(
                MongoStore::connect(uri, &settings.database.name)
                    .await
                    .map_err(io::Error::other)?,
            )
        }
    };

    let state = web::Data::new(AppState::new(
        store,
        settings.auth.clone(),
        settings.ledger.precision,
    ));
    let allowed_origin = settings.server.allowed_origin.clone();

    tracing::info!(host = %settings.server.host, port = settings.server.port, "listening");
    HttpServer::new(move || {
        let cors = match &allowed_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header(),
            None => Cors::permissive(),
        };
        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await
}
