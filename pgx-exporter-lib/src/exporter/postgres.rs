use super::{Connector, QueryResult, Session, Target};
use crate::Result;
use crate::values::SqlValue;
use chrono::{DateTime, NaiveDateTime, Utc};
use core::time::Duration;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use ohno::IntoAppError;
use tokio_postgres::{NoTls, SimpleQueryMessage};

const LOG_TARGET: &str = "  postgres";

const PING_QUERY: &str = "SELECT 1";

/// Connects to PostgreSQL through a small connection pool per target.
#[derive(Debug, Clone)]
pub struct PgConnector {
    pool_max_size: usize,
    connect_timeout: Duration,
}

impl PgConnector {
    #[must_use]
    pub const fn new(pool_max_size: usize, connect_timeout: Duration) -> Self {
        Self {
            pool_max_size,
            connect_timeout,
        }
    }
}

impl Connector for PgConnector {
    type Session = PgSession;

    async fn connect(&self, target: &Target) -> Result<PgSession> {
        let mut pg_config = target.pg_config()?;
        let _ = pg_config.connect_timeout(self.connect_timeout);

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(self.pool_max_size)
            .build()
            .into_app_err_with(|| format!("creating connection pool for {target}"))?;

        log::info!(target: LOG_TARGET, "Established new database connection pool to '{target}'");
        Ok(PgSession { pool })
    }
}

/// A pool of connections to one target.
pub struct PgSession {
    pool: Pool,
}

impl Session for PgSession {
    async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await.into_app_err("acquiring a pooled connection")?;
        let _ = client.simple_query(PING_QUERY).await.into_app_err("pinging database")?;
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<QueryResult> {
        let client = self.pool.get().await.into_app_err("acquiring a pooled connection")?;

        // The extended protocol describes column types; the simple protocol returns every value as text.
        // Descriptions are cached per pooled connection, so only the first run of a query pays the extra round trip.
        let statement = client.prepare_cached(sql).await.into_app_err("describing query")?;
        let columns: Vec<(String, String)> = statement
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.type_().name().to_string()))
            .collect();

        let messages = client.simple_query(sql).await.into_app_err("running query")?;

        let mut result = QueryResult::new(columns.iter().map(|(name, _)| name.as_str()));
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let values = columns
                    .iter()
                    .enumerate()
                    .map(|(index, (_, type_name))| decode(row.get(index), type_name))
                    .collect::<Vec<_>>();
                result.rows.push(values);
            }
        }

        Ok(result)
    }

    fn close(&self) {
        self.pool.close();
    }
}

impl core::fmt::Debug for PgSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PgSession").field("status", &self.pool.status()).finish()
    }
}

/// Decode a textual value according to its column type name.
///
/// Values that do not parse as their declared type are kept as text so coercion can report them.
fn decode(text: Option<&str>, type_name: &str) -> SqlValue {
    let Some(text) = text else {
        return SqlValue::Null;
    };

    match type_name {
        "bool" => match text {
            "t" => SqlValue::Bool(true),
            "f" => SqlValue::Bool(false),
            _ => SqlValue::Text(text.to_string()),
        },
        "int2" | "int4" | "int8" | "oid" | "xid" => text.parse().map_or_else(|_| SqlValue::Text(text.to_string()), SqlValue::Int),
        "float4" | "float8" | "numeric" => text.parse().map_or_else(|_| SqlValue::Text(text.to_string()), SqlValue::Float),
        "timestamptz" => DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z")
            .map_or_else(|_| SqlValue::Text(text.to_string()), |ts| SqlValue::Timestamp(ts.with_timezone(&Utc))),
        "timestamp" => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .map_or_else(|_| SqlValue::Text(text.to_string()), |ts| SqlValue::Timestamp(ts.and_utc())),
        _ => SqlValue::Text(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_null() {
        assert_eq!(decode(None, "int8"), SqlValue::Null);
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(Some("t"), "bool"), SqlValue::Bool(true));
        assert_eq!(decode(Some("f"), "bool"), SqlValue::Bool(false));
        assert_eq!(decode(Some("42"), "int4"), SqlValue::Int(42));
        assert_eq!(decode(Some("1.5"), "float8"), SqlValue::Float(1.5));
        assert_eq!(decode(Some("12345.678"), "numeric"), SqlValue::Float(12345.678));
        assert_eq!(decode(Some("active"), "text"), SqlValue::Text("active".to_string()));
        assert_eq!(decode(Some("10.0.0.1/32"), "inet"), SqlValue::Text("10.0.0.1/32".to_string()));
    }

    #[test]
    fn test_decode_timestamps() {
        let expected = SqlValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(decode(Some("2024-03-01 12:00:00+00"), "timestamptz"), expected);
        assert_eq!(decode(Some("2024-03-01 14:00:00+02"), "timestamptz"), expected);
        assert_eq!(decode(Some("2024-03-01 12:00:00"), "timestamp"), expected);
    }

    #[test]
    fn test_decode_falls_back_to_text() {
        assert_eq!(decode(Some("lots"), "int8"), SqlValue::Text("lots".to_string()));
        assert_eq!(decode(Some("00:00:05"), "interval"), SqlValue::Text("00:00:05".to_string()));
    }
}
