// src/main.rs

use std::io;
use std::sync::Arc;

use actix::Actor;
use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};

use project_management::app_state::AppState;
use project_management::auth::{Authentication, TokenVerifier};
use project_management::config::Config;
use project_management::db::MongoStore;
use project_management::events::{EventBus, ResumeReminders};
use project_management::mailer::{self, Mailer};
use project_management::store::{MemoryStore, Store};

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    let store: Arc<dyn Store> = match &config.mongo_uri {
        Some(uri) => Arc::new(
            MongoStore::init(uri, &config.database_name)
                .await
                .map_err(|e| startup_error("could not connect to MongoDB", e))?,
        ),
        None => {
            warn!("MONGO_URI is not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let mailer: Arc<dyn Mailer> = Arc::from(
        mailer::from_config(&config.smtp).map_err(|e| startup_error("invalid SMTP settings", e))?,
    );
    let verifier = Arc::new(
        TokenVerifier::from_config(&config).map_err(|e| startup_error("invalid token key", e))?,
    );
    if config.clerk_webhook_secret.is_none() {
        warn!("CLERK_WEBHOOK_SECRET is not set, identity webhooks will be refused");
    }

    let events = EventBus::new(store.clone(), mailer).start();
    events.do_send(ResumeReminders);

    let port = config.port;
    info!("Server running at http://0.0.0.0:{}", port);
    match &config.frontend_origin {
        Some(origin) => info!("Allowed CORS Origin: {}", origin),
        None => info!("Allowed CORS Origin: any"),
    }

    let state = AppState {
        store,
        events,
        config,
    };

    HttpServer::new(move || {
        let cors = match &state.config.frontend_origin {
            Some(origin) => Cors::default().allowed_origin(origin).supports_credentials(),
            None => Cors::default().allow_any_origin(),
        }
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
            http::header::AUTHORIZATION,
        ])
        .max_age(3600);

        App::new()
            .wrap(Authentication::new(verifier.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(project_management::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
