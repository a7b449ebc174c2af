// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::bind::{BindArgs, CallbackArgs, begin_bind, complete_bind};
use super::state::AppState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;

/// Route function that starts binding a Discord account by sending the user to Discord's authorization page
#[axum::debug_handler]
pub async fn discord_bind_route(
	Query(query): Query<BindArgs>,
	session: Session,
	State(state): State<AppState>,
) -> Response {
	match begin_bind(&state.config, &state.oauth_client, &session, query).await {
		Ok(oauth_url) => Redirect::to(oauth_url.as_str()).into_response(),
		Err(error) => error.into_response(),
	}
}

/// Route function for the OAuth bind callback
#[axum::debug_handler]
pub async fn discord_bind_callback_route(
	Query(query): Query<CallbackArgs>,
	session: Session,
	State(state): State<AppState>,
) -> Response {
	let outcome = complete_bind(
		&state.config,
		&session,
		state.discord.as_ref(),
		state.store.as_ref(),
		query,
	)
	.await;
	match outcome {
		Ok(outcome) => Redirect::to(outcome.redirect()).into_response(),
		Err(error) => error.into_response(),
	}
}
