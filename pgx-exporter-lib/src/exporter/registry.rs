use super::{Connection, Connector, Session, Target, loggable_dsn};
use crate::Result;
use core::fmt::{Debug, Formatter};
use ohno::IntoAppError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

const LOG_TARGET: &str = "  registry";

/// Caches one validated connection per connection string.
///
/// The cache lock is held across connect and probe, so there is at most one live
/// connection object per key. Lookups for unrelated targets wait on a slow probe.
pub struct Registry<C: Connector> {
    connector: C,
    constant_labels: BTreeMap<String, String>,
    connections: Mutex<HashMap<String, Arc<Connection<C::Session>>>>,
}

impl<C: Connector> Registry<C> {
    #[must_use]
    pub fn new(connector: C, constant_labels: BTreeMap<String, String>) -> Self {
        Self {
            connector,
            constant_labels,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached connection for `dsn`, opening one if needed.
    ///
    /// The connection is probed before it is returned. A failed probe evicts the entry,
    /// so the next call reconnects.
    pub async fn get_or_create(&self, dsn: &str) -> Result<Arc<Connection<C::Session>>> {
        let mut connections = self.connections.lock().await;

        let connection = if let Some(existing) = connections.get(dsn) {
            Arc::clone(existing)
        } else {
            let target = Target::parse(dsn)?;
            let session = self
                .connector
                .connect(&target)
                .await
                .into_app_err_with(|| format!("opening connection to database ({})", loggable_dsn(dsn)))?;

            log::debug!(target: LOG_TARGET, "Got a valid database connection for server '{target}'");
            let connection = Arc::new(Connection::new(target, session, &self.constant_labels));
            let _ = connections.insert(dsn.to_string(), Arc::clone(&connection));
            connection
        };

        if let Err(e) = connection.session().ping().await {
            log::error!(target: LOG_TARGET, "Error while pinging database '{}': {e}", connection.target());
            if let Some(evicted) = connections.remove(dsn) {
                evicted.session().close();
            }
            return Err(e).into_app_err_with(|| format!("validating connection to database ({})", loggable_dsn(dsn)));
        }

        Ok(connection)
    }

    /// Close every cached connection. Calling this more than once is harmless.
    pub async fn close_all(&self) {
        let mut connections = self.connections.lock().await;
        for (_, connection) in connections.drain() {
            log::debug!(target: LOG_TARGET, "Closing database connection pool for '{}'", connection.target());
            connection.session().close();
        }
    }

    /// Number of cached connections.
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }
}

impl<C: Connector + Debug> Debug for Registry<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("connector", &self.connector)
            .field("constant_labels", &self.constant_labels)
            .finish_non_exhaustive()
    }
}
