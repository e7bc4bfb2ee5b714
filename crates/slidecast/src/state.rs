// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::hub::Hub;

/// Shared server state handed to every route.
pub struct AppState {
    pub hub: Arc<Hub>,
    /// Secret a presenter must send in its first `auth` command.
    pub token: String,
    /// Cancelled on server shutdown; every agent runs under a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, token: String, shutdown: CancellationToken) -> Self {
        Self { hub, token, shutdown }
    }
}
