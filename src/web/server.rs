// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::auth::{discord_bind_callback_route, discord_bind_route};
use super::session::DatabaseStore;
use super::session_key::{BIND_PATH, CALLBACK_PATH};
use super::state::AppState;
use crate::config::ConfigData;
use crate::database::DbPool;
use crate::discord::HttpDiscordApi;
use crate::store::DatabaseBindingStore;
use axum::Router;
use axum::routing::get;
use miette::IntoDiagnostic;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::service::SessionManagerLayer;

/// The bind flow's routes. Callers add a session layer and the state.
pub fn bind_router() -> Router<AppState> {
	Router::new()
		.route(BIND_PATH, get(discord_bind_route))
		.route(CALLBACK_PATH, get(discord_bind_callback_route))
}

/// Serves the bind flow until the listener fails.
pub async fn run_server(
	config: Arc<ConfigData>,
	db_connection_pool: DbPool,
) -> miette::Result<()> {
	let site_addr = &config.web.bind_addr;

	let session_store = DatabaseStore::new(db_connection_pool.clone());
	let session_layer = SessionManagerLayer::new(session_store)
		.with_same_site(SameSite::Lax)
		.with_secure(config.web.base_url.starts_with("https://"));

	let discord = Arc::new(HttpDiscordApi::new(&config)?);
	let store = Arc::new(DatabaseBindingStore::new(db_connection_pool));
	let app_state = AppState::new(Arc::clone(&config), discord, store)?;

	let app = bind_router()
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(session_layer),
		)
		.with_state(app_state);

	tracing::info!("Listening on http://{}", site_addr);
	let listener = TcpListener::bind(site_addr).await.into_diagnostic()?;
	axum::serve(listener, app.into_make_service()).await.into_diagnostic()?;

	Ok(())
}
