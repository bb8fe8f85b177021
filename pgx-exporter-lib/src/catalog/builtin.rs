use super::{Catalog, ColumnDeclaration, Comparator, Op, OverrideDeclaration, Role, VersionRange};

macro_rules! column {
    ($name:expr, $role:ident, $description:expr) => {
        ColumnDeclaration::new($name, Role::$role, $description)
    };
    ($name:expr, $role:ident, $description:expr, [$($bound:expr),+]) => {
        ColumnDeclaration::new($name, Role::$role, $description).with_versions(VersionRange::new([$($bound),+]))
    };
}

const fn lt(major: u64, minor: u64) -> Comparator {
    Comparator::new(Op::Lt, major, minor, 0)
}

const fn ge(major: u64, minor: u64) -> Comparator {
    Comparator::new(Op::Ge, major, minor, 0)
}

const fn gt(major: u64, minor: u64) -> Comparator {
    Comparator::new(Op::Gt, major, minor, 0)
}

pub fn catalog() -> Catalog {
    Catalog::new()
        .with_namespace("pg_stat_bgwriter", pg_stat_bgwriter())
        .with_namespace("pg_stat_database", pg_stat_database())
        .with_namespace("pg_stat_database_conflicts", pg_stat_database_conflicts())
        .with_namespace("pg_locks", pg_locks())
        .with_namespace("pg_stat_replication", pg_stat_replication())
        .with_namespace("pg_stat_activity", pg_stat_activity())
        .with_overrides("pg_locks", [OverrideDeclaration::new(VersionRange::new([gt(0, 0)]), PG_LOCKS_QUERY)])
        .with_overrides(
            "pg_stat_replication",
            [
                OverrideDeclaration::new(VersionRange::new([ge(10, 0)]), PG_STAT_REPLICATION_QUERY_10),
                OverrideDeclaration::new(VersionRange::new([ge(9, 2), lt(10, 0)]), PG_STAT_REPLICATION_QUERY_92),
                OverrideDeclaration::new(VersionRange::new([lt(9, 2)]), PG_STAT_REPLICATION_QUERY_91),
            ],
        )
        .with_overrides(
            "pg_stat_activity",
            [
                OverrideDeclaration::new(VersionRange::new([ge(9, 2)]), PG_STAT_ACTIVITY_QUERY_92),
                OverrideDeclaration::new(VersionRange::new([lt(9, 2)]), PG_STAT_ACTIVITY_QUERY_91),
            ],
        )
}

fn pg_stat_bgwriter() -> Vec<ColumnDeclaration> {
    vec![
        column!("checkpoints_timed", Counter, "Number of scheduled checkpoints that have been performed"),
        column!("checkpoints_req", Counter, "Number of requested checkpoints that have been performed"),
        column!(
            "checkpoint_write_time",
            Counter,
            "Total amount of time that has been spent in the portion of checkpoint processing where files are written to disk, in milliseconds"
        ),
        column!(
            "checkpoint_sync_time",
            Counter,
            "Total amount of time that has been spent in the portion of checkpoint processing where files are synchronized to disk, in milliseconds"
        ),
        column!("buffers_checkpoint", Counter, "Number of buffers written during checkpoints"),
        column!("buffers_clean", Counter, "Number of buffers written by the background writer"),
        column!(
            "maxwritten_clean",
            Counter,
            "Number of times the background writer stopped a cleaning scan because it had written too many buffers"
        ),
        column!("buffers_backend", Counter, "Number of buffers written directly by a backend"),
        column!(
            "buffers_backend_fsync",
            Counter,
            "Number of times a backend had to execute its own fsync call (normally the background writer handles those even when the backend does its own write)"
        ),
        column!("buffers_alloc", Counter, "Number of buffers allocated"),
        column!("stats_reset", Counter, "Time at which these statistics were last reset"),
    ]
}

fn pg_stat_database() -> Vec<ColumnDeclaration> {
    vec![
        column!("datid", Label, "OID of a database"),
        column!("datname", Label, "Name of this database"),
        column!(
            "numbackends",
            Gauge,
            "Number of backends currently connected to this database. This is the only column in this view that returns a value reflecting current state; all other columns return the accumulated values since the last reset."
        ),
        column!("xact_commit", Counter, "Number of transactions in this database that have been committed"),
        column!("xact_rollback", Counter, "Number of transactions in this database that have been rolled back"),
        column!("blks_read", Counter, "Number of disk blocks read in this database"),
        column!(
            "blks_hit",
            Counter,
            "Number of times disk blocks were found already in the buffer cache, so that a read was not necessary (this only includes hits in the PostgreSQL buffer cache, not the operating system's file system cache)"
        ),
        column!("tup_returned", Counter, "Number of rows returned by queries in this database"),
        column!("tup_fetched", Counter, "Number of rows fetched by queries in this database"),
        column!("tup_inserted", Counter, "Number of rows inserted by queries in this database"),
        column!("tup_updated", Counter, "Number of rows updated by queries in this database"),
        column!("tup_deleted", Counter, "Number of rows deleted by queries in this database"),
        column!(
            "conflicts",
            Counter,
            "Number of queries canceled due to conflicts with recovery in this database. (Conflicts occur only on standby servers; see pg_stat_database_conflicts for details.)"
        ),
        column!(
            "temp_files",
            Counter,
            "Number of temporary files created by queries in this database. All temporary files are counted, regardless of why the temporary file was created (e.g., sorting or hashing), and regardless of the log_temp_files setting."
        ),
        column!(
            "temp_bytes",
            Counter,
            "Total amount of data written to temporary files by queries in this database. All temporary files are counted, regardless of why the temporary file was created, and regardless of the log_temp_files setting."
        ),
        column!("deadlocks", Counter, "Number of deadlocks detected in this database"),
        column!(
            "blk_read_time",
            Counter,
            "Time spent reading data file blocks by backends in this database, in milliseconds"
        ),
        column!(
            "blk_write_time",
            Counter,
            "Time spent writing data file blocks by backends in this database, in milliseconds"
        ),
        column!("stats_reset", Counter, "Time at which these statistics were last reset"),
    ]
}

fn pg_stat_database_conflicts() -> Vec<ColumnDeclaration> {
    vec![
        column!("datid", Label, "OID of a database"),
        column!("datname", Label, "Name of this database"),
        column!(
            "confl_tablespace",
            Counter,
            "Number of queries in this database that have been canceled due to dropped tablespaces"
        ),
        column!("confl_lock", Counter, "Number of queries in this database that have been canceled due to lock timeouts"),
        column!("confl_snapshot", Counter, "Number of queries in this database that have been canceled due to old snapshots"),
        column!("confl_bufferpin", Counter, "Number of queries in this database that have been canceled due to pinned buffers"),
        column!("confl_deadlock", Counter, "Number of queries in this database that have been canceled due to deadlocks"),
    ]
}

fn pg_locks() -> Vec<ColumnDeclaration> {
    vec![
        column!("datname", Label, "Name of this database"),
        column!("mode", Label, "Type of Lock"),
        column!("count", Gauge, "Number of locks"),
    ]
}

fn pg_stat_replication() -> Vec<ColumnDeclaration> {
    vec![
        column!("procpid", Discard, "Process ID of a WAL sender process", [lt(9, 2)]),
        column!("pid", Discard, "Process ID of a WAL sender process", [ge(9, 2)]),
        column!("usesysid", Discard, "OID of the user logged into this WAL sender process"),
        column!("usename", Discard, "Name of the user logged into this WAL sender process"),
        column!("application_name", Label, "Name of the application that is connected to this WAL sender"),
        column!(
            "client_addr",
            Label,
            "IP address of the client connected to this WAL sender. If this field is null, it indicates that the client is connected via a Unix socket on the server machine."
        ),
        column!(
            "client_hostname",
            Discard,
            "Host name of the connected client, as reported by a reverse DNS lookup of client_addr. This field will only be non-null for IP connections, and only when log_hostname is enabled."
        ),
        column!(
            "client_port",
            Discard,
            "TCP port number that the client is using for communication with this WAL sender, or -1 if a Unix socket is used"
        ),
        column!(
            "backend_start",
            Discard,
            "Time when this process was started, i.e., when the client connected to this WAL sender"
        ),
        column!("backend_xmin", Discard, "The current backend's xmin horizon."),
        column!("state", Label, "Current WAL sender state"),
        column!("sent_location", Discard, "Last transaction log position sent on this connection", [lt(10, 0)]),
        column!(
            "write_location",
            Discard,
            "Last transaction log position written to disk by this standby server",
            [lt(10, 0)]
        ),
        column!(
            "flush_location",
            Discard,
            "Last transaction log position flushed to disk by this standby server",
            [lt(10, 0)]
        ),
        column!(
            "replay_location",
            Discard,
            "Last transaction log position replayed into the database on this standby server",
            [lt(10, 0)]
        ),
        column!("sent_lsn", Discard, "Last transaction log position sent on this connection", [ge(10, 0)]),
        column!(
            "write_lsn",
            Discard,
            "Last transaction log position written to disk by this standby server",
            [ge(10, 0)]
        ),
        column!(
            "flush_lsn",
            Discard,
            "Last transaction log position flushed to disk by this standby server",
            [ge(10, 0)]
        ),
        column!(
            "replay_lsn",
            Discard,
            "Last transaction log position replayed into the database on this standby server",
            [ge(10, 0)]
        ),
        column!("sync_priority", Discard, "Priority of this standby server for being chosen as the synchronous standby"),
        column!("sync_state", Discard, "Synchronous state of this standby server"),
        column!("slot_name", Label, "A unique, cluster-wide identifier for the replication slot", [ge(9, 2)]),
        column!(
            "plugin",
            Discard,
            "The base name of the shared object containing the output plugin this logical slot is using, or null for physical slots"
        ),
        column!("slot_type", Discard, "The slot type - physical or logical"),
        column!(
            "datoid",
            Discard,
            "The OID of the database this slot is associated with, or null. Only logical slots have an associated database"
        ),
        column!(
            "database",
            Discard,
            "The name of the database this slot is associated with, or null. Only logical slots have an associated database"
        ),
        column!("active", Discard, "True if this slot is currently actively being used"),
        column!("active_pid", Discard, "Process ID of a WAL sender process"),
        column!(
            "xmin",
            Discard,
            "The oldest transaction that this slot needs the database to retain. VACUUM cannot remove tuples deleted by any later transaction"
        ),
        column!(
            "catalog_xmin",
            Discard,
            "The oldest transaction affecting the system catalogs that this slot needs the database to retain. VACUUM cannot remove catalog tuples deleted by any later transaction"
        ),
        column!(
            "restart_lsn",
            Discard,
            "The address (LSN) of oldest WAL which still might be required by the consumer of this slot and thus won't be automatically removed during checkpoints"
        ),
        column!("pg_current_xlog_location", Discard, "pg_current_xlog_location"),
        column!("pg_current_wal_lsn", Discard, "pg_current_xlog_location", [ge(10, 0)]),
        column!("pg_xlog_location_diff", Gauge, "Lag in bytes between master and slave", [ge(9, 2), lt(10, 0)]),
        column!("pg_wal_lsn_diff", Gauge, "Lag in bytes between master and slave", [ge(10, 0)]),
        column!(
            "confirmed_flush_lsn",
            Discard,
            "LSN position a consumer of a slot has confirmed flushing the data received"
        ),
        column!(
            "write_lag",
            Discard,
            "Time elapsed between flushing recent WAL locally and receiving notification that this standby server has written it (but not yet flushed it or applied it). This can be used to gauge the delay that synchronous_commit level remote_write incurred while committing if this server was configured as a synchronous standby.",
            [ge(10, 0)]
        ),
        column!(
            "flush_lag",
            Discard,
            "Time elapsed between flushing recent WAL locally and receiving notification that this standby server has written and flushed it (but not yet applied it). This can be used to gauge the delay that synchronous_commit level remote_flush incurred while committing if this server was configured as a synchronous standby.",
            [ge(10, 0)]
        ),
        column!(
            "replay_lag",
            Discard,
            "Time elapsed between flushing recent WAL locally and receiving notification that this standby server has written, flushed and applied it. This can be used to gauge the delay that synchronous_commit level remote_apply incurred while committing if this server was configured as a synchronous standby.",
            [ge(10, 0)]
        ),
    ]
}

fn pg_stat_activity() -> Vec<ColumnDeclaration> {
    vec![
        column!("datname", Label, "Name of this database"),
        column!("state", Label, "connection state", [ge(9, 2)]),
        column!("count", Gauge, "number of connections in this state"),
        column!("max_tx_duration", Gauge, "max duration in seconds any active transaction has been running"),
    ]
}

const PG_LOCKS_QUERY: &str = "SELECT pg_database.datname, tmp.mode, COALESCE(count, 0) AS count
FROM
    (
      VALUES ('accesssharelock'),
             ('rowsharelock'),
             ('rowexclusivelock'),
             ('shareupdateexclusivelock'),
             ('sharelock'),
             ('sharerowexclusivelock'),
             ('exclusivelock'),
             ('accessexclusivelock')
    ) AS tmp(mode) CROSS JOIN pg_database
LEFT JOIN
    (SELECT database, lower(mode) AS mode, count(*) AS count
     FROM pg_locks WHERE database IS NOT NULL
     GROUP BY database, lower(mode)
    ) AS tmp2
ON tmp.mode = tmp2.mode AND pg_database.oid = tmp2.database ORDER BY 1";

const PG_STAT_REPLICATION_QUERY_10: &str = "SELECT *,
    (CASE pg_is_in_recovery() WHEN 't' THEN NULL ELSE pg_current_wal_lsn() END) AS pg_current_wal_lsn,
    (CASE pg_is_in_recovery() WHEN 't' THEN NULL ELSE pg_wal_lsn_diff(pg_current_wal_lsn(), replay_lsn)::float END) AS pg_wal_lsn_diff
FROM pg_stat_replication";

const PG_STAT_REPLICATION_QUERY_92: &str = "SELECT *,
    (CASE pg_is_in_recovery() WHEN 't' THEN NULL ELSE pg_current_xlog_location() END) AS pg_current_xlog_location,
    (CASE pg_is_in_recovery() WHEN 't' THEN NULL ELSE pg_xlog_location_diff(pg_current_xlog_location(), replay_location)::float END) AS pg_xlog_location_diff
FROM pg_stat_replication";

const PG_STAT_REPLICATION_QUERY_91: &str = "SELECT *,
    (CASE pg_is_in_recovery() WHEN 't' THEN NULL ELSE pg_current_xlog_location() END) AS pg_current_xlog_location
FROM pg_stat_replication";

const PG_STAT_ACTIVITY_QUERY_92: &str = "SELECT
    pg_database.datname,
    tmp.state,
    COALESCE(count, 0) AS count,
    COALESCE(max_tx_duration, 0) AS max_tx_duration
FROM
    (
      VALUES ('active'),
             ('idle'),
             ('idle in transaction'),
             ('idle in transaction (aborted)'),
             ('fastpath function call'),
             ('disabled')
    ) AS tmp(state) CROSS JOIN pg_database
LEFT JOIN
    (
      SELECT
          datname,
          state,
          count(*) AS count,
          MAX(EXTRACT(EPOCH FROM now() - xact_start))::float AS max_tx_duration
      FROM pg_stat_activity GROUP BY datname, state
    ) AS tmp2
ON tmp.state = tmp2.state AND pg_database.datname = tmp2.datname";

const PG_STAT_ACTIVITY_QUERY_91: &str = "SELECT
    datname,
    'unknown' AS state,
    COALESCE(count(*), 0) AS count,
    COALESCE(MAX(EXTRACT(EPOCH FROM now() - xact_start))::float, 0) AS max_tx_duration
FROM pg_stat_activity GROUP BY datname";
