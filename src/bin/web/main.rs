use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use env_logger::Env;
use quillboard::db::{get_db_pool, init_db};
use quillboard::middleware::ClientCtx;
use rand::{distributions::Alphanumeric, Rng};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.")).await;

    // Starter notification categories must exist before any fan-out runs.
    quillboard::notifications::seed_default_categories(get_db_pool())
        .await
        .expect("Failed to seed notification categories.");

    let secret_key = match std::env::var("SECRET_KEY") {
        Ok(key) if key.len() >= 64 => Key::from(key.as_bytes()),
        other => {
            let random_string: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(128)
                .map(char::from)
                .collect();
            log::warn!(
                "SECRET_KEY missing or shorter than 64 bytes ({:?}); session cookies will \
                 invalidate on every restart. Need a key? How about:\r\n{}",
                other.map(|k| k.len()),
                random_string
            );
            Key::from(random_string.as_bytes())
        }
    };

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    log::info!("listening on {}", bind);

    HttpServer::new(move || {
        // Middleware is declared in reverse execution order.
        App::new()
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(false)
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(quillboard::web::configure)
    })
    .bind(bind)?
    .run()
    .await
}
