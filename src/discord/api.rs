// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::oauth::{DiscordOAuthClient, discord_oauth_client};
use crate::config::ConfigData;
use crate::model::ProfileRecord;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use miette::{Diagnostic, IntoDiagnostic};
use oauth2::basic::BasicTokenResponse;
use oauth2::{AuthorizationCode, TokenResponse};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

#[derive(Debug, Diagnostic, Error)]
pub enum DiscordApiError {
	#[error("failed to exchange the authorization code for a token: {0}")]
	#[diagnostic(code(discord_bind::token_exchange))]
	TokenExchange(String),
	#[error("request to Discord failed")]
	#[diagnostic(code(discord_bind::discord_request))]
	Request(#[from] reqwest::Error),
}

/// The outbound calls the bind flow makes to Discord
#[async_trait]
pub trait DiscordApi: Send + Sync {
	/// Trades an authorization code for a token grant.
	async fn exchange_code(&self, code: String) -> Result<TokenGrant, DiscordApiError>;

	/// Gets the profile of the user the access token was issued for.
	async fn current_user(&self, access_token: &str) -> Result<DiscordProfile, DiscordApiError>;

	/// Joins the token's user to the guild behind an invite code.
	async fn accept_invite(&self, access_token: &str, invite_code: &str) -> Result<InviteOutcome, DiscordApiError>;
}

/// The parts of a token response we keep
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenGrant {
	pub access_token: String,
	pub refresh_token: Option<String>,
	pub scopes: Vec<String>,
	pub expires_at: Option<DateTime<Utc>>,
}

impl TokenGrant {
	/// Converts a token endpoint response, pinning a relative lifetime to an absolute expiry from `received_at`.
	pub fn from_response(response: &BasicTokenResponse, received_at: DateTime<Utc>) -> Self {
		let expires_at = response
			.expires_in()
			.and_then(|lifetime| TimeDelta::from_std(lifetime).ok())
			.and_then(|lifetime| received_at.checked_add_signed(lifetime));
		Self {
			access_token: response.access_token().secret().clone(),
			refresh_token: response.refresh_token().map(|token| token.secret().clone()),
			scopes: response
				.scopes()
				.map(|scopes| scopes.iter().map(|scope| scope.as_str().to_string()).collect())
				.unwrap_or_default(),
			expires_at,
		}
	}
}

/// The fields of Discord's `/users/@me` response we bind
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct DiscordProfile {
	pub id: Id<UserMarker>,
	pub username: String,
	#[serde(default)]
	pub discriminator: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub avatar: Option<String>,
}

impl DiscordProfile {
	/// Flattens the profile and the token grant into the record stored for a bound account. Missing values become
	/// empty strings.
	pub fn into_record(self, grant: TokenGrant) -> ProfileRecord {
		ProfileRecord {
			uid: self.id,
			username: self.username,
			discriminator: self.discriminator.unwrap_or_default(),
			email: self.email.unwrap_or_default(),
			avatar: self.avatar.unwrap_or_default(),
			access_token: grant.access_token,
			refresh_token: grant.refresh_token.unwrap_or_default(),
			scope: grant.scopes.join(" "),
			expiry: grant.expires_at,
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InviteOutcome {
	Accepted,
	Rejected { status: u16, reason: String },
}

/// Talks to the real Discord API (or whatever the configured base URI points at)
pub struct HttpDiscordApi {
	oauth_client: DiscordOAuthClient,
	http_client: reqwest::Client,
	base_uri: String,
}

impl HttpDiscordApi {
	pub fn new(config: &ConfigData) -> miette::Result<Self> {
		let oauth_client = discord_oauth_client(config)?;
		// The token endpoint must not be allowed to redirect us elsewhere with the client secret.
		let http_client = reqwest::ClientBuilder::new()
			.redirect(reqwest::redirect::Policy::none())
			.user_agent(concat!("discord-bind/", env!("CARGO_PKG_VERSION")))
			.build()
			.into_diagnostic()?;
		Ok(Self {
			oauth_client,
			http_client,
			base_uri: config.discord.base_uri.clone(),
		})
	}
}

#[async_trait]
impl DiscordApi for HttpDiscordApi {
	async fn exchange_code(&self, code: String) -> Result<TokenGrant, DiscordApiError> {
		let token_response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code))
			.request_async(&self.http_client)
			.await;
		match token_response {
			Ok(response) => Ok(TokenGrant::from_response(&response, Utc::now())),
			Err(error) => Err(DiscordApiError::TokenExchange(error.to_string())),
		}
	}

	async fn current_user(&self, access_token: &str) -> Result<DiscordProfile, DiscordApiError> {
		let profile = self
			.http_client
			.get(format!("{}/users/@me", self.base_uri))
			.bearer_auth(access_token)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		Ok(profile)
	}

	async fn accept_invite(&self, access_token: &str, invite_code: &str) -> Result<InviteOutcome, DiscordApiError> {
		let response = self
			.http_client
			.post(format!("{}/invites/{}", self.base_uri, invite_code))
			.bearer_auth(access_token)
			.send()
			.await?;
		let status = response.status();
		if status == StatusCode::OK {
			Ok(InviteOutcome::Accepted)
		} else {
			Ok(InviteOutcome::Rejected {
				status: status.as_u16(),
				reason: status.canonical_reason().unwrap_or_default().to_string(),
			})
		}
	}
}
