// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::database::DbPool;
use crate::model::{
	BoundAccount, DiscordInvite, DiscordInviteGroup, LocalUser, PendingInvite, ProfileRecord,
};
use crate::schema::{discord_invite_groups, discord_invites, discord_users, local_user_groups, local_users};
use async_trait::async_trait;
use diesel::prelude::*;
use miette::IntoDiagnostic;
use std::collections::{BTreeSet, HashMap};

/// Whether an upsert changed an existing binding or created a new one
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpsertOutcome {
	Updated,
	Created,
}

/// Storage for local accounts, bindings, and invites
#[async_trait]
pub trait BindingStore: Send + Sync {
	/// Resolves the local account for an external identity key. Unknown keys get a new account when `create_unknown`
	/// is set. Inactive accounts never authenticate.
	async fn authenticate_remote_user(
		&self,
		remote_user: &str,
		create_unknown: bool,
	) -> miette::Result<Option<LocalUser>>;

	/// Names of the groups a local account belongs to
	async fn user_groups(&self, user: &LocalUser) -> miette::Result<BTreeSet<String>>;

	/// Binds the Discord account in `record` to `user`, overwriting any existing binding for that Discord account.
	/// Concurrent binds of the same Discord account never fail; the last write wins.
	async fn upsert_bound_account(&self, user: &LocalUser, record: &ProfileRecord) -> miette::Result<UpsertOutcome>;

	/// All active invites with their group restrictions, ordered by code
	async fn active_invites(&self) -> miette::Result<Vec<PendingInvite>>;
}

#[derive(Clone, Debug)]
pub struct DatabaseBindingStore {
	db_connection_pool: DbPool,
}

impl DatabaseBindingStore {
	pub fn new(db_connection_pool: DbPool) -> Self {
		Self { db_connection_pool }
	}

	/// Runs a blocking database operation on the blocking thread pool.
	async fn with_connection<T, F>(&self, operation: F) -> miette::Result<T>
	where
		F: FnOnce(&mut PgConnection) -> QueryResult<T> + Send + 'static,
		T: Send + 'static,
	{
		let db_connection_pool = self.db_connection_pool.clone();
		tokio::task::spawn_blocking(move || {
			let mut db_connection = db_connection_pool.get().into_diagnostic()?;
			operation(&mut *db_connection).into_diagnostic()
		})
		.await
		.into_diagnostic()?
	}
}

fn find_local_user(db_connection: &mut PgConnection, remote_user: &str) -> QueryResult<Option<LocalUser>> {
	local_users::table
		.filter(local_users::remote_user.eq(remote_user))
		.select(LocalUser::as_select())
		.first(db_connection)
		.optional()
}

#[async_trait]
impl BindingStore for DatabaseBindingStore {
	async fn authenticate_remote_user(
		&self,
		remote_user: &str,
		create_unknown: bool,
	) -> miette::Result<Option<LocalUser>> {
		let remote_user = remote_user.to_string();

		let user = self
			.with_connection(move |db_connection| {
				let existing_user = find_local_user(db_connection, &remote_user)?;
				if existing_user.is_some() || !create_unknown {
					return Ok(existing_user);
				}

				// Another callback for the same identity may create the account first; either way, the stored row wins.
				let new_user = LocalUser::new(&remote_user);
				let inserted = diesel::insert_into(local_users::table)
					.values(&new_user)
					.on_conflict(local_users::remote_user)
					.do_nothing()
					.execute(db_connection)?;
				if inserted > 0 {
					tracing::info!(user_id = %new_user.id, remote_user = %remote_user, "Created local account for Discord user");
				}
				find_local_user(db_connection, &remote_user)
			})
			.await?;

		Ok(user.filter(|user| user.is_active))
	}

	async fn user_groups(&self, user: &LocalUser) -> miette::Result<BTreeSet<String>> {
		let user_id = user.id.clone();
		let groups: Vec<String> = self
			.with_connection(move |db_connection| {
				local_user_groups::table
					.filter(local_user_groups::user_id.eq(&user_id))
					.select(local_user_groups::group_name)
					.load(db_connection)
			})
			.await?;
		Ok(groups.into_iter().collect())
	}

	async fn upsert_bound_account(&self, user: &LocalUser, record: &ProfileRecord) -> miette::Result<UpsertOutcome> {
		let account = BoundAccount::from_record(user, record);

		self.with_connection(move |db_connection| {
			db_connection.transaction::<_, diesel::result::Error, _>(|db_connection| {
				let inserted = diesel::insert_into(discord_users::table)
					.values(&account)
					.on_conflict(discord_users::uid)
					.do_nothing()
					.execute(db_connection)?;
				if inserted > 0 {
					return Ok(UpsertOutcome::Created);
				}

				diesel::update(&account).set(&account).execute(db_connection)?;
				Ok(UpsertOutcome::Updated)
			})
		})
		.await
	}

	async fn active_invites(&self) -> miette::Result<Vec<PendingInvite>> {
		let (invites, invite_groups) = self
			.with_connection(|db_connection| {
				let invites: Vec<DiscordInvite> = discord_invites::table
					.filter(discord_invites::active.eq(true))
					.order(discord_invites::code.asc())
					.select(DiscordInvite::as_select())
					.load(db_connection)?;
				let invite_codes: Vec<String> = invites.iter().map(|invite| invite.code.clone()).collect();

				let invite_groups: Vec<DiscordInviteGroup> = discord_invite_groups::table
					.filter(discord_invite_groups::invite_code.eq_any(invite_codes))
					.load(db_connection)?;
				Ok((invites, invite_groups))
			})
			.await?;

		let mut groups_by_invite: HashMap<String, BTreeSet<String>> = HashMap::new();
		for invite_group in invite_groups {
			groups_by_invite
				.entry(invite_group.invite_code)
				.or_default()
				.insert(invite_group.group_name);
		}

		let pending_invites = invites
			.into_iter()
			.map(|invite| {
				let groups = groups_by_invite.remove(&invite.code).unwrap_or_default();
				PendingInvite::from_database(invite, groups)
			})
			.collect();
		Ok(pending_invites)
	}
}
