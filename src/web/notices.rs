// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::session_key::NOTICES;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tower_sessions::session::Error;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum NoticeLevel {
	Info,
	Success,
	Warning,
	Error,
}

/// A one-time message for the user, shown by whichever page they land on next
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Notice {
	pub level: NoticeLevel,
	pub text: String,
}

impl Notice {
	pub fn success(text: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Success,
			text: text.into(),
		}
	}
}

/// Queues a notice behind any the session already holds.
pub async fn push_notice(session: &Session, notice: Notice) -> Result<(), Error> {
	let mut notices: Vec<Notice> = session.get(NOTICES).await?.unwrap_or_default();
	notices.push(notice);
	session.insert(NOTICES, notices).await
}

/// Removes and returns every queued notice, oldest first.
pub async fn take_notices(session: &Session) -> Result<Vec<Notice>, Error> {
	let notices: Option<Vec<Notice>> = session.remove(NOTICES).await?;
	Ok(notices.unwrap_or_default())
}
