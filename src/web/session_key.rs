// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub const BIND_PATH: &str = "/discord_bind";
pub const CALLBACK_PATH: &str = "/discord_bind/cb";

pub const BIND_OAUTH_STATE: &str = "discord_bind_oauth_state";
pub const BIND_INVITE_URI: &str = "discord_bind_invite_uri";
pub const BIND_RETURN_URI: &str = "discord_bind_return_uri";
pub const BIND_NEXT_URI: &str = "discord_bind_next_uri";

/// Every key the bind flow leaves in the session between the redirect to Discord and the callback
pub const BIND_TRANSIENT_KEYS: [&str; 4] = [BIND_OAUTH_STATE, BIND_INVITE_URI, BIND_RETURN_URI, BIND_NEXT_URI];

pub const LOCAL_USER: &str = "local_user";
pub const NOTICES: &str = "notices";
