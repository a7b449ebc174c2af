// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::DatabaseConfig;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use miette::{Diagnostic, IntoDiagnostic, miette};
use oauth2::url::Url;
use std::error::Error as StdError;
use thiserror::Error;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Diagnostic, Error)]
pub enum MigrationError {
	#[error("couldn't get a database connection to run migrations")]
	#[diagnostic(code(discord_bind::migrations::connection))]
	Connection(#[from] PoolError),
	#[error("failed to run database migrations: {0}")]
	#[diagnostic(code(discord_bind::migrations::run))]
	Run(Box<dyn StdError + Send + Sync>),
}

pub fn connect_db(db_config: &DatabaseConfig) -> miette::Result<DbPool> {
	let manager: ConnectionManager<PgConnection> = ConnectionManager::new(db_url(db_config)?);
	Pool::builder().test_on_check_out(true).build(manager).into_diagnostic()
}

/// Builds the connection URL, percent-encoding the credentials.
fn db_url(db_config: &DatabaseConfig) -> miette::Result<String> {
	let mut url = Url::parse(&format!("postgres://{}", db_config.host)).into_diagnostic()?;
	url.set_username(&db_config.username)
		.map_err(|_| miette!("database.username can't be used in a connection URL"))?;
	url.set_password(Some(&db_config.password))
		.map_err(|_| miette!("database.password can't be used in a connection URL"))?;
	url.set_port(db_config.port)
		.map_err(|_| miette!("database.port can't be used with this host"))?;
	url.set_path(&db_config.database);
	Ok(url.into())
}

/// Applies pending migrations, returning the versions that were applied.
pub fn run_embedded_migrations(db_connection_pool: &DbPool) -> Result<Vec<String>, MigrationError> {
	let mut db_connection = db_connection_pool.get()?;
	let applied: Vec<String> = db_connection
		.run_pending_migrations(MIGRATIONS)
		.map_err(MigrationError::Run)?
		.into_iter()
		.map(|version| version.to_string())
		.collect();
	for version in applied.iter() {
		tracing::info!(%version, "Applied database migration");
	}
	Ok(applied)
}
