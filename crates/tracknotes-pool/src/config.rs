//! Configuration for the connection pool

use std::time::Duration;

/// Configuration for [`ConnectionPool`](crate::ConnectionPool).
///
/// # Examples
///
/// ```
/// use tracknotes_pool::PoolConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = PoolConfig::default();
///
/// // Override just one field
/// let config = PoolConfig {
///    max_connections: 4,
///    ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
   /// Maximum number of connections that may exist at any time, idle or on
   /// loan. Checkouts past this bound queue until a connection is released.
   ///
   /// Default: 10
   pub max_connections: usize,

   /// Number of connections opened at pool construction and retained when
   /// connections are released. Released connections above this floor are
   /// closed instead of idled.
   ///
   /// Default: 2
   pub min_connections: usize,

   /// How long a queued checkout waits for a connection before failing with
   /// [`Error::CheckoutTimeout`](crate::Error::CheckoutTimeout).
   ///
   /// Default: 30 seconds
   pub checkout_timeout: Duration,
}

impl Default for PoolConfig {
   fn default() -> Self {
      Self {
         max_connections: 10,
         min_connections: 2,
         checkout_timeout: Duration::from_secs(30),
      }
   }
}

impl PoolConfig {
   /// Build a config from environment variables, falling back to the
   /// defaults for anything unset or unparseable.
   ///
   /// Recognized variables:
   ///
   /// - `DB_POOL_MAX_CONNECTIONS`
   /// - `DB_POOL_MIN_CONNECTIONS`
   /// - `DB_POOL_CHECKOUT_TIMEOUT_MS`
   pub fn from_env() -> Self {
      Self::from_lookup(|name| std::env::var(name).ok())
   }

   fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
      let defaults = Self::default();

      let parse = |name: &str| lookup(name).and_then(|v| v.parse::<u64>().ok());

      Self {
         max_connections: parse("DB_POOL_MAX_CONNECTIONS")
            .map(|n| n as usize)
            .unwrap_or(defaults.max_connections),
         min_connections: parse("DB_POOL_MIN_CONNECTIONS")
            .map(|n| n as usize)
            .unwrap_or(defaults.min_connections),
         checkout_timeout: parse("DB_POOL_CHECKOUT_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.checkout_timeout),
      }
   }

   /// Clamp the config into a usable shape: at least one connection, and an
   /// idle floor no larger than the ceiling.
   pub(crate) fn normalized(mut self) -> Self {
      self.max_connections = self.max_connections.max(1);
      self.min_connections = self.min_connections.min(self.max_connections);
      self
   }
}
