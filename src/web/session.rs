// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::database::DbPool;
use crate::model::Session;
use crate::schema::sessions;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::{SessionStore, session_store};

/// Keeps the bind flow's session state (OAuth state, redirect targets, logged-in account) in Postgres so it
/// survives restarts between the redirect to Discord and the callback.
#[derive(Clone, Debug)]
pub struct DatabaseStore {
	db_connection_pool: DbPool,
}

impl DatabaseStore {
	pub fn new(db_connection_pool: DbPool) -> Self {
		Self { db_connection_pool }
	}

	/// Runs a blocking database operation on the blocking thread pool.
	async fn with_connection<T, F>(&self, operation: F) -> session_store::Result<T>
	where
		F: FnOnce(&mut PgConnection) -> session_store::Result<T> + Send + 'static,
		T: Send + 'static,
	{
		let db_connection_pool = self.db_connection_pool.clone();
		tokio::task::spawn_blocking(move || {
			let mut db_connection = db_connection_pool.get().map_err(|error| {
				session_store::Error::Backend(format!("Couldn't get database connection: {}", error))
			})?;
			operation(&mut *db_connection)
		})
		.await
		.map_err(|error| session_store::Error::Backend(format!("Session database task failed: {}", error)))?
	}
}

#[async_trait]
impl SessionStore for DatabaseStore {
	async fn create(&self, record: &mut Record) -> session_store::Result<()> {
		let mut new_record = record.clone();
		let created_id = self
			.with_connection(move |db_connection| {
				// Session IDs are random, but a collision must not overwrite someone else's session.
				loop {
					let new_session = session_row(&new_record)?;
					let db_result = diesel::insert_into(sessions::table)
						.values(new_session)
						.execute(db_connection);
					match db_result {
						Ok(_) => return Ok(new_record.id),
						Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
							tracing::debug!("Session ID collision; regenerating");
							new_record.id = Id::default();
						}
						Err(error) => {
							return Err(session_store::Error::Backend(format!(
								"Failed to create new session: {}",
								error
							)));
						}
					}
				}
			})
			.await?;
		record.id = created_id;
		Ok(())
	}

	async fn save(&self, record: &Record) -> session_store::Result<()> {
		let session = session_row(record)?;

		self.with_connection(move |db_connection| {
			diesel::insert_into(sessions::table)
				.values(&session)
				.on_conflict(sessions::session_id)
				.do_update()
				.set((sessions::data.eq(&session.data), sessions::expires.eq(session.expires)))
				.execute(db_connection)
				.map_err(|error| session_store::Error::Backend(format!("Failed to update session: {}", error)))?;
			Ok(())
		})
		.await
	}

	async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
		let session_id = *session_id;

		let session = self
			.with_connection(move |db_connection| {
				diesel::delete(sessions::table)
					.filter(sessions::expires.le(Utc::now()))
					.execute(db_connection)
					.map_err(|error| {
						session_store::Error::Backend(format!("Failed to expire old sessions: {}", error))
					})?;

				let db_session_id: BigDecimal = session_id.0.into();
				sessions::table
					.find(db_session_id)
					.first::<Session>(db_connection)
					.optional()
					.map_err(|error| {
						session_store::Error::Backend(format!("Couldn't retrieve session from database: {}", error))
					})
			})
			.await?;

		let Some(session) = session else {
			return Ok(None);
		};
		let data =
			serde_json::from_str(&session.data).map_err(|error| session_store::Error::Decode(format!("{:?}", error)))?;
		Ok(Some(Record {
			id: session_id,
			data,
			expiry_date: offset_expiry(session.expires)?,
		}))
	}

	async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
		let db_session_id: BigDecimal = session_id.0.into();

		self.with_connection(move |db_connection| {
			diesel::delete(sessions::table)
				.filter(sessions::session_id.eq(db_session_id))
				.execute(db_connection)
				.map_err(|error| session_store::Error::Backend(format!("Failed to delete session: {}", error)))?;
			Ok(())
		})
		.await
	}
}

fn session_row(record: &Record) -> session_store::Result<Session> {
	let data = serde_json::to_string(&record.data).map_err(|error| session_store::Error::Encode(format!("{:?}", error)))?;
	Ok(Session {
		session_id: record.id.0.into(),
		data,
		expires: chrono_expiry(record.expiry_date)?,
	})
}

fn chrono_expiry(expiry_date: OffsetDateTime) -> session_store::Result<DateTime<Utc>> {
	let expires: i64 = expiry_date
		.unix_timestamp_nanos()
		.try_into()
		.map_err(|error| session_store::Error::Backend(format!("Timestamp out of bounds: {}", error)))?;
	Ok(DateTime::from_timestamp_nanos(expires))
}

fn offset_expiry(expires: DateTime<Utc>) -> session_store::Result<OffsetDateTime> {
	let Some(expiry_date) = expires.timestamp_nanos_opt() else {
		return Err(session_store::Error::Backend(String::from(
			"Out of range expiration timestamp",
		)));
	};
	OffsetDateTime::from_unix_timestamp_nanos(expiry_date.into())
		.map_err(|error| session_store::Error::Backend(format!("Timestamp conversion error: {}", error)))
}
