// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use discord_bind::config::parse_config;
use discord_bind::database::{connect_db, run_embedded_migrations};
use discord_bind::web::server::run_server;
use std::sync::Arc;

#[tokio::main]
async fn main() -> miette::Result<()> {
	tracing_subscriber::fmt::init();

	let config_path = std::env::args().nth(1).unwrap_or_else(|| String::from("config.kdl"));
	let config = Arc::new(parse_config(&config_path).await?);

	let db_connection_pool = connect_db(&config.database)?;
	run_embedded_migrations(&db_connection_pool)?;

	run_server(config, db_connection_pool).await
}
