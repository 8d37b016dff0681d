//! OAuth2 plumbing for Google Drive storage
//!
//! Holds the client configuration used by both the storage backend and the
//! setup command, the token type they exchange, and the two token endpoint
//! calls (authorization code exchange and refresh).
//!
//! # Example
//!
//! ```no_run
//! use drive_oauth::OAuthConfig;
//!
//! # async fn example() -> Result<(), drive_oauth::OAuthError> {
//! let config = OAuthConfig::from_env()?;
//! println!("visit {}", config.auth_code_url("state-token"));
//!
//! let http = reqwest::Client::new();
//! let token = config.exchange(&http, "4/0Ab...").await?;
//! for line in token.store_config() {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod exchange;
mod token;

pub use config::{OAuthConfig, CLIENT_ID_ENV, CLIENT_SECRET_ENV, DRIVE_APPDATA_SCOPE};
pub use error::{OAuthError, Result};
pub use token::OAuthToken;
