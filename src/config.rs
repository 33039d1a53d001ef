use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::StoreMiddlewareError;
use crate::types::StoreKind;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Key/value accessor the host process hands to the middleware.
///
/// The middleware never touches the environment or the filesystem itself; whatever loaded the
/// variables (dotenv file, secrets manager, test fixture) sits behind this trait.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// Connection settings for one store. Immutable once built.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
    username: String,
    password: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default = "default_connect_timeout", with = "timeout_secs")]
    connect_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            namespace: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Target keyspace (Cassandra) or database (Postgres) to open the session against.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build a config from `<PREFIX>HOST`, `<PREFIX>PORT`, `<PREFIX>USERNAME`,
    /// `<PREFIX>PASSWORD` and `<PREFIX>KEYSPACE` / `<PREFIX>DATABASE`, where the prefix is
    /// `CASSANDRA_` or `POSTGRES_`.
    ///
    /// Host defaults to `localhost` and port to the store's usual port.
    ///
    /// # Errors
    /// Returns `StoreMiddlewareError::ConfigError` if the username or password is missing or the
    /// port is not a valid TCP port.
    pub fn from_source(
        kind: StoreKind,
        source: &impl ConfigSource,
    ) -> Result<Self, StoreMiddlewareError> {
        let prefix = kind.config_prefix();
        let key = |name: &str| format!("{prefix}{name}");

        let host = source
            .get(&key("HOST"))
            .unwrap_or_else(|| "localhost".to_string());
        let port = match source.get(&key("PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                StoreMiddlewareError::ConfigError(format!("{} is not a valid port: {e}", key("PORT")))
            })?,
            None => kind.default_port(),
        };
        let username = source.get(&key("USERNAME")).ok_or_else(|| {
            StoreMiddlewareError::ConfigError(format!("{} is required", key("USERNAME")))
        })?;
        let password = source.get(&key("PASSWORD")).ok_or_else(|| {
            StoreMiddlewareError::ConfigError(format!("{} is required", key("PASSWORD")))
        })?;

        let mut config = ConnectionConfig::new(host, port, username, password);
        if let Some(namespace) = source
            .get(&key(kind.namespace_key()))
            .filter(|ns| !ns.trim().is_empty())
        {
            config = config.with_namespace(namespace);
        }
        Ok(config)
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

// Manual Debug implementation so the password never ends up in logs
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("namespace", &self.namespace)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
