//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the simulation runs with zero
//! configuration.

use tracing::warn;

use salon_shared::constants::APP_NAME;

/// Mediation server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Human-readable name for this server instance.
    /// Env: `SALON_INSTANCE_NAME`
    /// Default: `"Salon"`
    pub instance_name: String,

    /// Skip delivery to recipients that are not currently registered.
    ///
    /// By default the server trusts whatever user handles the caller passes
    /// and never consults the registry during delivery. Enabling this makes
    /// the registry authoritative; skipped recipients are logged.
    /// Env: `SALON_REQUIRE_REGISTERED` (true/false)
    /// Default: `false`
    pub require_registered: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: APP_NAME.to_string(),
            require_registered: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("SALON_INSTANCE_NAME") {
            if name.trim().is_empty() {
                warn!("Empty SALON_INSTANCE_NAME, using default");
            } else {
                config.instance_name = name;
            }
        }

        if let Ok(val) = std::env::var("SALON_REQUIRE_REGISTERED") {
            config.require_registered = flag_enabled(&val);
        }

        config
    }
}

/// Interpret an environment flag value as a boolean.
fn flag_enabled(val: &str) -> bool {
    matches!(val.trim(), "1" | "true" | "True" | "TRUE")
}
