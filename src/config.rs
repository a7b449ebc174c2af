// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::web::session_key::CALLBACK_PATH;
use kdl::{KdlDocument, KdlValue};
use miette::{IntoDiagnostic, Result, miette};
use tokio::fs::read_to_string;

pub const DEFAULT_BASE_URI: &str = "https://discord.com/api";
pub const DEFAULT_AUTHZ_PATH: &str = "/oauth2/authorize";
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/token";
pub const DEFAULT_INVITE_URI: &str = "https://discord.com/channels/@me";
pub const DEFAULT_RETURN_URI: &str = "/";

pub async fn parse_config(config_path: &str) -> Result<ConfigData> {
	let config_file_contents = read_to_string(config_path).await.into_diagnostic()?;
	parse_config_str(&config_file_contents)
}

pub fn parse_config_str(config_file_contents: &str) -> Result<ConfigData> {
	let document: KdlDocument = config_file_contents.parse()?;

	let discord = section(&document, "discord")?;
	let discord = DiscordConfig {
		client_id: required_string(discord, "discord", "client_id")?,
		client_secret: required_string(discord, "discord", "client_secret")?,
		base_uri: optional_string(discord, "discord", "base_uri")?.unwrap_or_else(|| DEFAULT_BASE_URI.to_string()),
		authz_path: optional_string(discord, "discord", "authz_path")?
			.unwrap_or_else(|| DEFAULT_AUTHZ_PATH.to_string()),
		token_path: optional_string(discord, "discord", "token_path")?
			.unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string()),
		redirect_uri: optional_string(discord, "discord", "redirect_uri")?,
	};

	// Every setting in the bind section has a default, so the section itself may be left out.
	let empty_section = KdlDocument::new();
	let bind = match document.get("bind") {
		Some(node) => node.children().unwrap_or(&empty_section),
		None => &empty_section,
	};
	let bind = BindConfig {
		invite_uri: optional_string(bind, "bind", "invite_uri")?.unwrap_or_else(|| DEFAULT_INVITE_URI.to_string()),
		return_uri: optional_string(bind, "bind", "return_uri")?.unwrap_or_else(|| DEFAULT_RETURN_URI.to_string()),
		error_uri: optional_string(bind, "bind", "error_uri")?,
		email_scope: optional_bool(bind, "bind", "email_scope")?.unwrap_or(true),
		invite_scope: optional_bool(bind, "bind", "invite_scope")?.unwrap_or(true),
		create_unknown_users: optional_bool(bind, "bind", "create_unknown_users")?.unwrap_or(true),
	};

	let web = section(&document, "web")?;
	let web = WebConfig {
		bind_addr: required_string(web, "web", "bind_addr")?,
		base_url: required_string(web, "web", "base_url")?,
	};

	let database = section(&document, "database")?;
	let port = match database.get_arg("port") {
		Some(value) => {
			let port = value
				.as_integer()
				.ok_or_else(|| miette!("database.port must be an integer"))?;
			Some(u16::try_from(port).map_err(|_| miette!("database.port is out of range: {}", port))?)
		}
		None => None,
	};
	let database = DatabaseConfig {
		host: required_string(database, "database", "host")?,
		port,
		username: required_string(database, "database", "username")?,
		password: required_string(database, "database", "password")?,
		database: required_string(database, "database", "database")?,
	};

	Ok(ConfigData {
		discord,
		bind,
		web,
		database,
	})
}

fn section<'a>(document: &'a KdlDocument, name: &str) -> Result<&'a KdlDocument> {
	document
		.get(name)
		.and_then(|node| node.children())
		.ok_or_else(|| miette!("Missing required config block: {}", name))
}

fn optional_string(section: &KdlDocument, section_name: &str, name: &str) -> Result<Option<String>> {
	match section.get_arg(name) {
		Some(KdlValue::String(value)) => Ok(Some(value.clone())),
		Some(_) => Err(miette!("{}.{} must be a string", section_name, name)),
		None => Ok(None),
	}
}

fn required_string(section: &KdlDocument, section_name: &str, name: &str) -> Result<String> {
	optional_string(section, section_name, name)?
		.ok_or_else(|| miette!("Missing required config value: {}.{}", section_name, name))
}

fn optional_bool(section: &KdlDocument, section_name: &str, name: &str) -> Result<Option<bool>> {
	match section.get_arg(name) {
		Some(KdlValue::Bool(value)) => Ok(Some(*value)),
		Some(_) => Err(miette!("{}.{} must be #true or #false", section_name, name)),
		None => Ok(None),
	}
}

#[derive(Clone, Debug)]
pub struct ConfigData {
	pub discord: DiscordConfig,
	pub bind: BindConfig,
	pub web: WebConfig,
	pub database: DatabaseConfig,
}

impl ConfigData {
	/// The redirect URI handed to Discord. Falls back to this application's own callback route when no override is
	/// configured.
	pub fn redirect_uri(&self) -> String {
		match &self.discord.redirect_uri {
			Some(uri) => uri.clone(),
			None => format!("{}{}", self.web.base_url.trim_end_matches('/'), CALLBACK_PATH),
		}
	}
}

/// OAuth2 client settings for the Discord application
#[derive(Clone, Debug)]
pub struct DiscordConfig {
	pub client_id: String,
	pub client_secret: String,
	/// API root that the authorization, token, profile, and invite paths are appended to
	pub base_uri: String,
	pub authz_path: String,
	pub token_path: String,
	pub redirect_uri: Option<String>,
}

impl DiscordConfig {
	pub fn authorization_url(&self) -> String {
		format!("{}{}", self.base_uri, self.authz_path)
	}

	pub fn token_url(&self) -> String {
		format!("{}{}", self.base_uri, self.token_path)
	}
}

/// Behavior of the binding flow itself
#[derive(Clone, Debug)]
pub struct BindConfig {
	pub invite_uri: String,
	pub return_uri: String,
	/// Where to send users who refuse authorization. The site root is used when unset.
	pub error_uri: Option<String>,
	/// Always request the `email` scope
	pub email_scope: bool,
	/// Request `guilds.join` so pending invites can be accepted on the user's behalf
	pub invite_scope: bool,
	/// Create a local account the first time an unknown Discord user binds
	pub create_unknown_users: bool,
}

#[derive(Clone, Debug)]
pub struct WebConfig {
	pub bind_addr: String,
	pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
	pub host: String,
	pub port: Option<u16>,
	pub username: String,
	pub password: String,
	pub database: String,
}
