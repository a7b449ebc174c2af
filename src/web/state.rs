// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::ConfigData;
use crate::discord::DiscordApi;
use crate::discord::oauth::{DiscordOAuthClient, discord_oauth_client};
use crate::store::BindingStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
	pub config: Arc<ConfigData>,
	pub oauth_client: DiscordOAuthClient,
	pub discord: Arc<dyn DiscordApi>,
	pub store: Arc<dyn BindingStore>,
}

impl AppState {
	/// Builds the shared state. Fails if the configured Discord URLs don't parse, so a bad config is caught at
	/// startup rather than on the first login.
	pub fn new(
		config: Arc<ConfigData>,
		discord: Arc<dyn DiscordApi>,
		store: Arc<dyn BindingStore>,
	) -> miette::Result<Self> {
		let oauth_client = discord_oauth_client(&config)?;
		Ok(Self {
			config,
			oauth_client,
			discord,
			store,
		})
	}
}
