//! gcloud adapter: exchange a service-account key for an access token.

use std::path::Path;

use super::CommandSpec;

/// Registry username signalling token-based authentication
pub const OAUTH2_TOKEN_USER: &str = "oauth2accesstoken";

/// gcloud CLI wrapper
#[derive(Debug, Clone)]
pub struct GcloudCli {
    binary: String,
}

impl GcloudCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Activate the service account whose key is stored at `key_file`
    pub fn activate_service_account(&self, key_file: &Path) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args(["auth", "activate-service-account", "--key-file"])
            .arg(key_file.display().to_string())
    }

    /// Print a short-lived OAuth2 access token for the active account
    pub fn print_access_token(&self) -> CommandSpec {
        CommandSpec::new(&self.binary).args(["auth", "print-access-token"])
    }
}
