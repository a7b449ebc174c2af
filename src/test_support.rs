// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::{ConfigData, parse_config_str};
use crate::discord::{DiscordApi, DiscordApiError, DiscordProfile, InviteOutcome, TokenGrant};
use crate::model::{BoundAccount, LocalUser, PendingInvite, ProfileRecord, database_id_from_discord};
use crate::store::{BindingStore, UpsertOutcome};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower_sessions::{MemoryStore, Session};
use twilight_model::id::Id;

pub const TEST_CONFIG: &str = r#"
discord {
	client_id "1234567890"
	client_secret "client-secret"
	base_uri "https://discord.test/api"
}
web {
	bind_addr "127.0.0.1:0"
	base_url "https://bind.example.com"
}
database {
	host "localhost"
	username "bind"
	password "password"
	database "bind"
}
"#;

pub fn test_config() -> ConfigData {
	parse_config_str(TEST_CONFIG).unwrap()
}

pub fn memory_session() -> Session {
	Session::new(None, Arc::new(MemoryStore::default()), None)
}

pub fn test_invite(code: &str, groups: &[&str]) -> PendingInvite {
	PendingInvite {
		code: code.to_string(),
		guild_name: format!("{} guild", code),
		channel_name: String::from("general"),
		active: true,
		groups: groups.iter().map(|group| group.to_string()).collect(),
	}
}

/// Stands in for Discord. Invites are accepted unless marked as rejected or failing.
pub struct FakeDiscordApi {
	access_token: String,
	expires_at: Option<DateTime<Utc>>,
	rejected_invites: HashSet<String>,
	failing_invites: HashSet<String>,
	token_exchanges: Mutex<usize>,
	attempted_invites: Mutex<Vec<String>>,
	accepted_invites: Mutex<Vec<String>>,
}

impl Default for FakeDiscordApi {
	fn default() -> Self {
		Self::with_access_token("access")
	}
}

impl FakeDiscordApi {
	pub fn with_access_token(access_token: &str) -> Self {
		Self {
			access_token: access_token.to_string(),
			expires_at: Some(Self::expiry()),
			rejected_invites: HashSet::new(),
			failing_invites: HashSet::new(),
			token_exchanges: Mutex::new(0),
			attempted_invites: Mutex::new(Vec::new()),
			accepted_invites: Mutex::new(Vec::new()),
		}
	}

	pub fn without_expiry() -> Self {
		Self {
			expires_at: None,
			..Self::default()
		}
	}

	pub fn rejecting(mut self, invite_code: &str) -> Self {
		self.rejected_invites.insert(invite_code.to_string());
		self
	}

	pub fn failing(mut self, invite_code: &str) -> Self {
		self.failing_invites.insert(invite_code.to_string());
		self
	}

	pub fn expiry() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
	}

	pub fn default_profile() -> DiscordProfile {
		DiscordProfile {
			id: Id::new(80351110224678912),
			username: String::from("Nelly"),
			discriminator: Some(String::from("1337")),
			email: None,
			avatar: None,
		}
	}

	pub fn token_exchanges(&self) -> usize {
		*self.token_exchanges.lock().unwrap()
	}

	pub fn attempted_invites(&self) -> Vec<String> {
		self.attempted_invites.lock().unwrap().clone()
	}

	pub fn accepted_invites(&self) -> Vec<String> {
		self.accepted_invites.lock().unwrap().clone()
	}
}

#[async_trait]
impl DiscordApi for FakeDiscordApi {
	async fn exchange_code(&self, _code: String) -> Result<TokenGrant, DiscordApiError> {
		*self.token_exchanges.lock().unwrap() += 1;
		Ok(TokenGrant {
			access_token: self.access_token.clone(),
			refresh_token: Some(String::from("refresh")),
			scopes: vec![
				String::from("identify"),
				String::from("guilds"),
				String::from("guilds.join"),
			],
			expires_at: self.expires_at,
		})
	}

	async fn current_user(&self, _access_token: &str) -> Result<DiscordProfile, DiscordApiError> {
		Ok(Self::default_profile())
	}

	async fn accept_invite(&self, _access_token: &str, invite_code: &str) -> Result<InviteOutcome, DiscordApiError> {
		self.attempted_invites.lock().unwrap().push(invite_code.to_string());
		if self.failing_invites.contains(invite_code) {
			return Err(DiscordApiError::TokenExchange(String::from("connection reset")));
		}
		if self.rejected_invites.contains(invite_code) {
			return Ok(InviteOutcome::Rejected {
				status: 403,
				reason: String::from("Forbidden"),
			});
		}
		self.accepted_invites.lock().unwrap().push(invite_code.to_string());
		Ok(InviteOutcome::Accepted)
	}
}

#[derive(Default)]
struct MemoryBindingData {
	users: Vec<LocalUser>,
	groups: HashMap<String, BTreeSet<String>>,
	bound_accounts: Vec<BoundAccount>,
	invites: Vec<PendingInvite>,
}

/// Keeps accounts and invites in memory the same way the database store keeps them in Postgres
#[derive(Default)]
pub struct MemoryBindingStore {
	data: Mutex<MemoryBindingData>,
}

impl MemoryBindingStore {
	pub fn add_user(&self, user: LocalUser, groups: &[&str]) {
		let mut data = self.data.lock().unwrap();
		data.groups
			.insert(user.id.clone(), groups.iter().map(|group| group.to_string()).collect());
		data.users.push(user);
	}

	pub fn add_invite(&self, invite: PendingInvite) {
		self.data.lock().unwrap().invites.push(invite);
	}

	pub fn bound_accounts(&self) -> Vec<BoundAccount> {
		self.data.lock().unwrap().bound_accounts.clone()
	}
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
	async fn authenticate_remote_user(
		&self,
		remote_user: &str,
		create_unknown: bool,
	) -> miette::Result<Option<LocalUser>> {
		let mut data = self.data.lock().unwrap();
		let existing_user = data.users.iter().find(|user| user.remote_user == remote_user).cloned();
		let user = match existing_user {
			Some(user) => user,
			None if create_unknown => {
				let user = LocalUser::new(remote_user);
				data.users.push(user.clone());
				user
			}
			None => return Ok(None),
		};
		Ok(Some(user).filter(|user| user.is_active))
	}

	async fn user_groups(&self, user: &LocalUser) -> miette::Result<BTreeSet<String>> {
		let data = self.data.lock().unwrap();
		Ok(data.groups.get(&user.id).cloned().unwrap_or_default())
	}

	async fn upsert_bound_account(&self, user: &LocalUser, record: &ProfileRecord) -> miette::Result<UpsertOutcome> {
		let mut data = self.data.lock().unwrap();
		let uid = database_id_from_discord(record.uid.get());
		match data.bound_accounts.iter_mut().find(|account| account.uid == uid) {
			Some(account) => {
				account.apply(user, record);
				Ok(UpsertOutcome::Updated)
			}
			None => {
				data.bound_accounts.push(BoundAccount::from_record(user, record));
				Ok(UpsertOutcome::Created)
			}
		}
	}

	async fn active_invites(&self) -> miette::Result<Vec<PendingInvite>> {
		let data = self.data.lock().unwrap();
		let mut invites: Vec<PendingInvite> = data.invites.iter().filter(|invite| invite.active).cloned().collect();
		invites.sort_by(|first, second| first.code.cmp(&second.code));
		Ok(invites)
	}
}
