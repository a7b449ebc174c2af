// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::error::BindError;
use super::notices::{Notice, push_notice};
use super::session_key::{
	BIND_INVITE_URI, BIND_NEXT_URI, BIND_OAUTH_STATE, BIND_RETURN_URI, BIND_TRANSIENT_KEYS, LOCAL_USER,
};
use crate::config::ConfigData;
use crate::discord::oauth::{DiscordOAuthClient, authorization_url, requested_scopes};
use crate::discord::{DiscordApi, InviteOutcome};
use crate::model::{LocalUser, eligible_invites};
use crate::store::{BindingStore, UpsertOutcome};
use oauth2::url::Url;
use serde::Deserialize;
use tower_sessions::Session;

pub const ACCESS_DENIED: &str = "access_denied";
pub const LOGIN_ERROR_URI: &str = "/?login_error=true";

/// Query arguments accepted when starting the bind flow
#[derive(Debug, Default, Deserialize)]
pub struct BindArgs {
	pub invite_uri: Option<String>,
	pub return_uri: Option<String>,
	pub next: Option<String>,
	/// Any non-empty value requests the `email` scope
	pub raise_email: Option<String>,
}

impl BindArgs {
	fn raise_email(&self) -> bool {
		self.raise_email.as_deref().is_some_and(|value| !value.is_empty())
	}
}

/// Query arguments Discord sends back to the callback
#[derive(Debug, Default, Deserialize)]
pub struct CallbackArgs {
	pub code: Option<String>,
	pub state: Option<String>,
	pub error: Option<String>,
}

/// How a callback that didn't fail outright ended
#[derive(Debug, Eq, PartialEq)]
pub enum CallbackOutcome {
	/// The user refused to authorize the application.
	AccessDenied { redirect: String },
	/// No local account could be resolved for the Discord user.
	LoginError { redirect: String },
	/// The Discord account is bound and logged in.
	Bound {
		redirect: String,
		binding: UpsertOutcome,
		invites_accepted: usize,
	},
}

impl CallbackOutcome {
	pub fn redirect(&self) -> &str {
		match self {
			Self::AccessDenied { redirect } | Self::LoginError { redirect } | Self::Bound { redirect, .. } => redirect,
		}
	}
}

/// Records where to send the user once they're back, and produces the Discord authorization URL to send them to
/// now.
pub async fn begin_bind(
	config: &ConfigData,
	oauth_client: &DiscordOAuthClient,
	session: &Session,
	args: BindArgs,
) -> Result<Url, BindError> {
	let scopes = requested_scopes(&config.bind, args.raise_email());

	let invite_uri = args.invite_uri.unwrap_or_else(|| config.bind.invite_uri.clone());
	let return_uri = args.return_uri.unwrap_or_else(|| config.bind.return_uri.clone());
	let next_uri = args.next.unwrap_or_else(|| String::from("/"));
	session.insert(BIND_INVITE_URI, invite_uri).await?;
	session.insert(BIND_RETURN_URI, return_uri).await?;
	session.insert(BIND_NEXT_URI, next_uri).await?;

	let (url, csrf_state) = authorization_url(oauth_client, scopes);
	session.insert(BIND_OAUTH_STATE, csrf_state.secret().clone()).await?;

	Ok(url)
}

/// Handles Discord's redirect back to us: checks the OAuth state, binds the Discord account to a local account,
/// and accepts whatever invites that account is eligible for.
pub async fn complete_bind(
	config: &ConfigData,
	session: &Session,
	discord: &dyn DiscordApi,
	store: &dyn BindingStore,
	args: CallbackArgs,
) -> Result<CallbackOutcome, BindError> {
	// Reachable without a valid state, so the session must stay untouched here.
	if args.error.as_deref() == Some(ACCESS_DENIED) {
		let error_uri = config.bind.error_uri.as_deref().unwrap_or("/");
		return Ok(CallbackOutcome::AccessDenied {
			redirect: format!("{}?error={}", error_uri, ACCESS_DENIED),
		});
	}

	let expected_state: Option<String> = session.get(BIND_OAUTH_STATE).await?;
	match (expected_state, args.state) {
		(Some(expected_state), Some(returned_state)) if expected_state == returned_state => (),
		_ => return Err(BindError::StateMismatch),
	}
	let Some(code) = args.code else {
		return Err(BindError::MissingCode);
	};

	let grant = discord.exchange_code(code).await?;
	let access_token = grant.access_token.clone();
	let profile = discord.current_user(&access_token).await?;
	let record = profile.into_record(grant);

	let remote_user = record.uid.to_string();
	let user = store
		.authenticate_remote_user(&remote_user, config.bind.create_unknown_users)
		.await?;
	let Some(user) = user else {
		tracing::info!(remote_user = %remote_user, "No local account for Discord user");
		clear_transient_state(session).await?;
		return Ok(CallbackOutcome::LoginError {
			redirect: String::from(LOGIN_ERROR_URI),
		});
	};
	log_in(session, &user).await?;
	let binding = store.upsert_bound_account(&user, &record).await?;
	tracing::debug!(user_id = %user.id, remote_user = %remote_user, ?binding, "Bound Discord account");

	let invites_accepted = accept_invites(discord, store, &user, &access_token).await?;
	if invites_accepted > 0 {
		push_notice(
			session,
			Notice::success(format!("{} Discord invite(s) accepted.", invites_accepted)),
		)
		.await?;
	}

	// The invite and return URIs are recorded too, but only the next URI decides where the user goes.
	let redirect: Option<String> = session.get(BIND_NEXT_URI).await?;
	let redirect = redirect.unwrap_or_else(|| String::from("/"));

	clear_transient_state(session).await?;

	Ok(CallbackOutcome::Bound {
		redirect,
		binding,
		invites_accepted,
	})
}

/// Marks the session as belonging to a local account. The session ID is replaced first so an ID planted before
/// login can't be used afterward.
pub async fn log_in(session: &Session, user: &LocalUser) -> Result<(), tower_sessions::session::Error> {
	session.cycle_id().await?;
	session.insert(LOCAL_USER, &user.id).await
}

/// Accepts every invite the user is eligible for, returning how many Discord accepted. A failed invite is logged
/// and skipped.
async fn accept_invites(
	discord: &dyn DiscordApi,
	store: &dyn BindingStore,
	user: &LocalUser,
	access_token: &str,
) -> Result<usize, BindError> {
	let user_groups = store.user_groups(user).await?;
	let invites = eligible_invites(store.active_invites().await?, &user_groups);

	let mut accepted = 0;
	for invite in invites {
		match discord.accept_invite(access_token, &invite.code).await {
			Ok(InviteOutcome::Accepted) => {
				accepted += 1;
				tracing::info!(
					guild = %invite.guild_name,
					channel = %invite.channel_name,
					"Accepted Discord invite"
				);
			}
			Ok(InviteOutcome::Rejected { status, reason }) => {
				tracing::error!(
					guild = %invite.guild_name,
					channel = %invite.channel_name,
					status,
					reason = %reason,
					"Failed to accept Discord invite"
				);
			}
			Err(error) => {
				tracing::error!(
					source = ?error,
					guild = %invite.guild_name,
					channel = %invite.channel_name,
					"Failed to accept Discord invite"
				);
			}
		}
	}
	Ok(accepted)
}

/// Removes the bind flow's keys from the session. Keys that aren't there are skipped.
async fn clear_transient_state(session: &Session) -> Result<(), tower_sessions::session::Error> {
	for key in BIND_TRANSIENT_KEYS {
		session.remove_value(key).await?;
	}
	Ok(())
}
