use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthService, TokenService};
use crate::configuration::{DatabaseSettings, Environment, Settings};
use crate::middleware::{RequestGate, RequestLogger};
use crate::routes::{
    api_root, health_check, json_config, login, logout, refresh_token, register, SessionCookie,
};
use crate::store::{PgCredentialStore, PgRefreshTokenStore};

/// Open the Postgres pool and apply migrations.
///
/// Outside production a failed connection is logged and the service starts
/// with a lazy pool instead, so it can come up before the database does.
pub async fn connect_database(
    settings: &DatabaseSettings,
    environment: Environment,
) -> Result<PgPool, sqlx::Error> {
    let connection_string = settings.connection_string();

    match pool_options().connect(&connection_string).await {
        Ok(pool) => {
            tracing::info!("Database connection pool created successfully");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
            tracing::info!("Database migrations applied");
            Ok(pool)
        }
        Err(e) if !environment.is_production() => {
            tracing::error!(error = %e, "Database failed to connect, continuing with a lazy pool");
            pool_options().connect_lazy(&connection_string)
        }
        Err(e) => Err(e),
    }
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
}

/// Wire the auth service to Postgres-backed stores
pub fn build_auth_service(pool: PgPool, settings: &Settings) -> AuthService {
    AuthService::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgRefreshTokenStore::new(pool)),
        TokenService::new(&settings.jwt),
    )
}

pub fn run(
    listener: TcpListener,
    auth: AuthService,
    environment: Environment,
) -> Result<Server, std::io::Error> {
    let tokens = auth.tokens().clone();
    let auth = web::Data::new(auth);
    let cookie = web::Data::new(SessionCookie {
        secure: environment.is_production(),
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(auth.clone())
            .app_data(cookie.clone())
            .app_data(json_config())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .route("", web::get().to(api_root))
                    .route("/", web::get().to(api_root))
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/refresh-token", web::post().to(refresh_token))
                            .service(
                                web::resource("/logout")
                                    .wrap(RequestGate::new(tokens.clone()))
                                    .route(web::post().to(logout)),
                            ),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
