// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::discord::DiscordApiError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use miette::Diagnostic;
use thiserror::Error;

/// Ways the bind flow can fail outright. Anything recoverable (a refused authorization, an unknown account, a
/// rejected invite) is a redirect instead.
#[derive(Debug, Diagnostic, Error)]
pub enum BindError {
	#[error("OAuth state is missing or doesn't match this session")]
	#[diagnostic(code(discord_bind::forbidden))]
	StateMismatch,
	#[error("callback arrived without an authorization code")]
	#[diagnostic(code(discord_bind::missing_code))]
	MissingCode,
	#[error("session storage failed")]
	#[diagnostic(code(discord_bind::session))]
	Session(#[from] tower_sessions::session::Error),
	#[error(transparent)]
	#[diagnostic(transparent)]
	Discord(#[from] DiscordApiError),
	#[error("account storage failed")]
	#[diagnostic(code(discord_bind::store))]
	Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BindError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::StateMismatch => StatusCode::FORBIDDEN,
			Self::MissingCode => StatusCode::BAD_REQUEST,
			Self::Discord(_) => StatusCode::BAD_GATEWAY,
			Self::Session(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl From<miette::Report> for BindError {
	fn from(report: miette::Report) -> Self {
		Self::Store(report.into())
	}
}

impl IntoResponse for BindError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		match &self {
			Self::StateMismatch => tracing::warn!("Rejected Discord callback with a bad OAuth state"),
			error => tracing::error!(source = ?error, "Discord bind flow failed"),
		}
		status.into_response()
	}
}
