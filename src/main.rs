#![warn(clippy::pedantic)]

use std::sync::Arc;

use blog::{
	config::Config,
	identity::JwtProvider,
	store::{MemoryStore, PgStore},
	trace,
	upload::Uploads,
	Database, State,
};

async fn shutdown_signal() {
	if let Err(error) = tokio::signal::ctrl_c().await {
		tracing::error!(%error, "failed to listen for shutdown signal");
	}
}

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	let _guard = trace::init_tracing_subscriber().expect("failed to initialize tracing");
	let config = Config::from_env().expect("invalid configuration");

	let database: Database = match &config.database_url {
		Some(url) => {
			let store = PgStore::connect(url, config.database_max_connections)
				.await
				.expect("failed to connect to database");

			store.migrate().await.expect("failed to run migrations");
			Arc::new(store)
		}
		None => {
			tracing::warn!("DATABASE_URL is not set, data will be kept in memory");
			Arc::new(MemoryStore::new())
		}
	};

	let mut identity = JwtProvider::new(&config.identity_key, config.identity_issuer.as_deref())
		.expect("invalid identity verification key");

	if let Some(key) = &config.identity_api_key {
		identity = identity.with_profile_api(&config.identity_api_url, key);
	}

	let uploads = Uploads::new(&config.uploads_dir, config.max_upload_bytes);

	uploads
		.ensure_dir()
		.await
		.expect("failed to create uploads directory");

	let app = blog::app(State {
		database,
		identity: Arc::new(identity),
		uploads,
	});

	let listener = tokio::net::TcpListener::bind((config.host, config.port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on {}:{}", config.host, config.port);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.expect("server error");
}
