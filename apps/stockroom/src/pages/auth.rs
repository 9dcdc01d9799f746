//! # Auth Page
//!
//! Password sign-in and sign-out. The session bookkeeping (persisting it,
//! clearing it, moving off the login page) happens in `SessionState` when
//! the resulting auth event is pumped.

use tracing::{debug, info};

use stockroom_backend::{AuthUser, Credentials};

use crate::error::ApiError;
use crate::App;

/// Signs in with e-mail and password.
pub async fn sign_in(app: &App, email: &str, password: &str) -> Result<AuthUser, ApiError> {
    let credentials = Credentials::new(email, password);
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(ApiError::validation("E-mail and password are required"));
    }

    debug!(email = %credentials.email, "sign_in");
    let session = app.backend.inner().sign_in(&credentials).await?;
    app.session.pump();

    info!(user = %session.user.id, "sign_in complete");
    Ok(session.user)
}

/// Signs out. The local session is cleared even if the server call fails.
pub async fn sign_out(app: &App) -> Result<(), ApiError> {
    let result = app.backend.inner().sign_out().await;
    app.session.pump();
    result?;
    Ok(())
}

pub fn current_user(app: &App) -> Option<AuthUser> {
    app.session.user()
}
