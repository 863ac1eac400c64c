use clap::Subcommand;
use focusboard_core::{auth, CoreError};

use super::Output;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a Google Calendar access token in the OS keyring
    SetToken {
        /// OAuth access token
        token: String,
    },
    /// Remove the stored token
    Clear,
    /// Report whether a token is available
    Status,
}

pub fn run(action: AuthAction, out: Output) -> Result<(), CoreError> {
    match action {
        AuthAction::SetToken { token } => {
            auth::store_access_token(&token)?;
            out.emit(&serde_json::json!({ "success": true }), |_| {
                println!("Token stored");
            })?;
        }
        AuthAction::Clear => {
            auth::clear_access_token()?;
            out.emit(&serde_json::json!({ "success": true }), |_| {
                println!("Token removed");
            })?;
        }
        AuthAction::Status => {
            let present = auth::access_token().is_some();
            out.emit(&serde_json::json!({ "token": present }), |_| {
                println!("Token: {}", if present { "present" } else { "missing" });
            })?;
        }
    }
    Ok(())
}
