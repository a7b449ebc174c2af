// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::{BindConfig, ConfigData};
use miette::IntoDiagnostic;
use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{AuthUrl, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenUrl};

pub const SCOPE_IDENTIFY: &str = "identify";
pub const SCOPE_EMAIL: &str = "email";
pub const SCOPE_GUILDS: &str = "guilds";
pub const SCOPE_GUILDS_JOIN: &str = "guilds.join";

/// An OAuth client with the authorization and token endpoints configured
pub type DiscordOAuthClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Gets the OAuth client object for interacting with Discord as an OAuth2 client
pub fn discord_oauth_client(config: &ConfigData) -> miette::Result<DiscordOAuthClient> {
	let client_id = ClientId::new(config.discord.client_id.clone());
	let client_secret = ClientSecret::new(config.discord.client_secret.clone());

	let auth_url = AuthUrl::new(config.discord.authorization_url()).into_diagnostic()?;
	let token_url = TokenUrl::new(config.discord.token_url()).into_diagnostic()?;
	let redirect_url = RedirectUrl::new(config.redirect_uri()).into_diagnostic()?;

	let client = BasicClient::new(client_id)
		.set_client_secret(client_secret)
		.set_auth_uri(auth_url)
		.set_token_uri(token_url)
		.set_redirect_uri(redirect_url);
	Ok(client)
}

/// The scopes to request. `raise_email` asks for the user's email address even when the application doesn't
/// normally want it.
pub fn requested_scopes(config: &BindConfig, raise_email: bool) -> Vec<Scope> {
	let mut scopes = vec![Scope::new(String::from(SCOPE_IDENTIFY))];
	if config.email_scope || raise_email {
		scopes.push(Scope::new(String::from(SCOPE_EMAIL)));
	}
	scopes.push(Scope::new(String::from(SCOPE_GUILDS)));
	if config.invite_scope {
		scopes.push(Scope::new(String::from(SCOPE_GUILDS_JOIN)));
	}
	scopes
}

/// Builds the URL to send the user to for authorization along with the anti-forgery state token Discord will echo
/// back to us.
pub fn authorization_url(client: &DiscordOAuthClient, scopes: Vec<Scope>) -> (Url, CsrfToken) {
	client.authorize_url(CsrfToken::new_random).add_scopes(scopes).url()
}
