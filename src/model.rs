// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::schema::{discord_invite_groups, discord_invites, discord_users, local_users, sessions};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::collections::{BTreeSet, HashSet};
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

/// A stored web session
#[derive(Insertable, Queryable)]
pub struct Session {
	pub session_id: BigDecimal,
	pub data: String,
	pub expires: DateTime<Utc>,
}

/// A local account that a Discord account can be bound to
#[derive(Clone, Debug, Insertable, PartialEq, Queryable, Selectable)]
#[diesel(table_name = local_users)]
pub struct LocalUser {
	/// The account's ID
	pub id: String,
	/// The external identity key used to authenticate this account. For accounts created through the bind flow,
	/// this is the decimal Discord user ID.
	pub remote_user: String,
	/// Inactive accounts can't log in
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
}

impl LocalUser {
	/// Creates a new, active account for the given external identity key.
	pub fn new(remote_user: &str) -> Self {
		Self {
			id: cuid2::create_id(),
			remote_user: remote_user.to_string(),
			is_active: true,
			created_at: Utc::now(),
		}
	}
}

/// Everything we keep about a Discord account after a successful authorization, flattened from the user's profile
/// and the token grant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileRecord {
	pub uid: Id<UserMarker>,
	pub username: String,
	pub discriminator: String,
	pub email: String,
	pub avatar: String,
	pub access_token: String,
	pub refresh_token: String,
	/// Granted scopes, space-separated
	pub scope: String,
	pub expiry: Option<DateTime<Utc>>,
}

/// The database representation of the link between a local account and a Discord account
#[derive(AsChangeset, Clone, Debug, Identifiable, Insertable, PartialEq, Queryable, Selectable)]
#[diesel(table_name = discord_users, primary_key(uid), treat_none_as_null = true)]
pub struct BoundAccount {
	/// The Discord user ID.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_uid].
	pub uid: i64,
	/// The local account the Discord account is bound to
	pub user_id: String,
	pub username: String,
	pub discriminator: String,
	pub email: String,
	pub avatar: String,
	pub access_token: String,
	pub refresh_token: String,
	pub scope: String,
	/// When the access token expires, if Discord told us
	pub expiry: Option<DateTime<Utc>>,
}

impl BoundAccount {
	/// Builds a new binding from a freshly authorized profile.
	pub fn from_record(user: &LocalUser, record: &ProfileRecord) -> Self {
		Self {
			uid: database_id_from_discord(record.uid.get()),
			user_id: user.id.clone(),
			username: record.username.clone(),
			discriminator: record.discriminator.clone(),
			email: record.email.clone(),
			avatar: record.avatar.clone(),
			access_token: record.access_token.clone(),
			refresh_token: record.refresh_token.clone(),
			scope: record.scope.clone(),
			expiry: record.expiry,
		}
	}

	/// Overwrites every field of an existing binding with a freshly authorized profile.
	pub fn apply(&mut self, user: &LocalUser, record: &ProfileRecord) {
		*self = Self::from_record(user, record);
	}

	/// Gets the Discord user.
	///
	/// For the raw database representation, use [Self::uid].
	pub fn get_uid(&self) -> Id<UserMarker> {
		Id::new(discord_id_from_database_id(self.uid))
	}
}

/// The database representation of an invite the application can accept on behalf of users
#[derive(Clone, Debug, Insertable, Queryable, Selectable)]
#[diesel(table_name = discord_invites)]
pub struct DiscordInvite {
	/// The invite code, as in `https://discord.gg/<code>`
	pub code: String,
	pub active: bool,
	pub description: String,
	pub guild_id: Option<i64>,
	pub guild_name: String,
	pub channel_id: Option<i64>,
	pub channel_name: String,
}

/// Restricts an invite to members of a group
#[derive(Insertable, Queryable)]
#[diesel(table_name = discord_invite_groups)]
pub struct DiscordInviteGroup {
	pub invite_code: String,
	pub group_name: String,
}

/// An invite along with the groups it's restricted to
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingInvite {
	pub code: String,
	pub guild_name: String,
	pub channel_name: String,
	pub active: bool,
	/// Groups whose members get this invite. Empty means everyone does.
	pub groups: BTreeSet<String>,
}

impl PendingInvite {
	pub fn from_database(invite: DiscordInvite, groups: BTreeSet<String>) -> Self {
		Self {
			code: invite.code,
			guild_name: invite.guild_name,
			channel_name: invite.channel_name,
			active: invite.active,
			groups,
		}
	}

	pub fn is_eligible_for(&self, user_groups: &BTreeSet<String>) -> bool {
		self.active && (self.groups.is_empty() || !self.groups.is_disjoint(user_groups))
	}
}

/// Filters invites down to those a user in the given groups should join, keeping the original order.
/// Each invite code appears at most once in the result.
pub fn eligible_invites(invites: Vec<PendingInvite>, user_groups: &BTreeSet<String>) -> Vec<PendingInvite> {
	let mut seen_codes: HashSet<String> = HashSet::new();
	invites
		.into_iter()
		.filter(|invite| invite.is_eligible_for(user_groups))
		.filter(|invite| seen_codes.insert(invite.code.clone()))
		.collect()
}

/// Converts an ID used with Discord (unsigned) to an ID for Postgres use (signed)
pub fn database_id_from_discord(discord_id: u64) -> i64 {
	discord_id as i64
}

/// Converts an ID retrieved from the database (signed) to an ID for use with Discord (unsigned)
pub fn discord_id_from_database_id(database_id: i64) -> u64 {
	database_id as u64
}
