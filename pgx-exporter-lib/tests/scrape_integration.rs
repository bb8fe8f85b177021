//! End-to-end scrape cycles against scripted in-memory servers.

mod support;

use camino::Utf8PathBuf;
use core::time::Duration;
use pgx_exporter_lib::catalog::{Catalog, ColumnDeclaration, OverrideDeclaration, Role};
use pgx_exporter_lib::commands::{OutputFormat, ScrapeLoop, run_scrape_loop};
use pgx_exporter_lib::exporter::{Exporter, ExporterOptions, MetricSample, QueryResult, Registry, Snapshot, discover_databases, hashsum};
use pgx_exporter_lib::mapping::ValueKind;
use pgx_exporter_lib::values::{CoercionError, SqlValue};
use std::collections::BTreeMap;
use support::{FakeConnector, FakeServer, TestHost};

const DSN: &str = "host=db1 port=5432 user=postgres";
const FINGERPRINT: &str = "db1:5432";

fn catalog() -> Catalog {
    Catalog::new()
        .with_namespace(
            "pg_test",
            [
                ColumnDeclaration::new("datname", Role::Label, "Name of the database"),
                ColumnDeclaration::new("numbackends", Role::Gauge, "Number of backends"),
                ColumnDeclaration::new("xact_commit", Role::Counter, "Transactions committed"),
                ColumnDeclaration::new("state", Role::MappedEnum, "Connection state").with_mapping([("active", 1.0), ("idle", 0.0)]),
                ColumnDeclaration::new("blk_time", Role::Duration, "Time spent reading blocks"),
                ColumnDeclaration::new("new_col", Role::Gauge, "Only on 10 and later").with_versions(">=10".parse().unwrap()),
                ColumnDeclaration::new("ignored", Role::Discard, "Not reported"),
            ],
        )
        .with_namespace("pg_broken", [ColumnDeclaration::new("x", Role::Counter, "Always fails")])
        .with_namespace("pg_old", [ColumnDeclaration::new("y", Role::Gauge, "Only before 9.0")])
        .with_overrides("pg_old", [OverrideDeclaration::new("<9.0".parse().unwrap(), "SELECT 1 AS y")])
}

fn test_rows(state: &str) -> QueryResult {
    QueryResult::new(["datname", "numbackends", "xact_commit", "state", "blk_time", "new_col", "ignored", "drift"])
        .with_row([
            SqlValue::from("db_a"),
            SqlValue::Int(3),
            SqlValue::Int(10),
            SqlValue::from(state),
            SqlValue::from("5ms"),
            SqlValue::Float(1.5),
            SqlValue::Int(99),
            SqlValue::from("7"),
        ])
        .with_row([
            SqlValue::Null,
            SqlValue::Int(1),
            SqlValue::Int(2),
            SqlValue::from("idle"),
            SqlValue::from("-1"),
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::from("not a number"),
        ])
}

fn server(version: &str) -> FakeServer {
    let server = FakeServer::new(version);
    server.respond("SELECT * FROM pg_test;", test_rows("active"));
    server
}

fn options() -> ExporterOptions {
    ExporterOptions {
        disable_settings_metrics: true,
        ..ExporterOptions::default()
    }
}

fn find<'a>(snapshot: &'a Snapshot, name: &str) -> Vec<&'a MetricSample> {
    snapshot.samples().filter(|s| s.name == name).collect()
}

fn single<'a>(snapshot: &'a Snapshot, name: &str) -> &'a MetricSample {
    let found = find(snapshot, name);
    assert_eq!(found.len(), 1, "expected exactly one {name}, got {found:?}");
    found[0]
}

#[tokio::test]
async fn test_scrape_emits_typed_samples() {
    let db1 = server("PostgreSQL 10.1 on x86_64-pc-linux-gnu");
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1.clone()), catalog(), vec![DSN.to_string()], options());

    let snapshot = exporter.scrape().await;
    let result = &snapshot.results[0];
    assert!(result.connected());
    assert!(result.version_error.is_none());

    let backends = find(&snapshot, "pg_test_numbackends");
    assert_eq!(backends.len(), 2);
    assert_eq!(backends[0].value, 3.0);
    assert_eq!(backends[0].kind, ValueKind::Gauge);
    assert_eq!(backends[0].label("server"), Some(FINGERPRINT));
    assert_eq!(backends[0].label("datname"), Some("db_a"));

    // A NULL label value becomes the empty string rather than dropping the row.
    assert_eq!(backends[1].label("datname"), Some(""));

    let commits = find(&snapshot, "pg_test_xact_commit");
    assert_eq!(commits[0].kind, ValueKind::Counter);
    assert_eq!(commits[0].help, "Transactions committed");

    let states: Vec<_> = find(&snapshot, "pg_test_state").iter().map(|s| s.value).collect();
    assert_eq!(states, [1.0, 0.0]);

    // "-1" means unknown: no sample and no error.
    let blk = single(&snapshot, "pg_test_blk_time_milliseconds");
    assert_eq!(blk.value, 5.0);

    // NULL converts to NaN and is still reported.
    let new_col = find(&snapshot, "pg_test_new_col");
    assert_eq!(new_col[0].value, 1.5);
    assert!(new_col[1].value.is_nan());

    assert!(find(&snapshot, "pg_test_ignored").is_empty());
    assert!(find(&snapshot, "pg_test_datname").is_empty());

    let drift = single(&snapshot, "pg_test_drift");
    assert_eq!(drift.kind, ValueKind::Untyped);
    assert_eq!(drift.help, "Unknown metric from pg_test");
    assert_eq!(drift.value, 7.0);

    // The unparsable drift value is the only soft error.
    assert_eq!(result.value_errors.len(), 1);
    assert_eq!(result.value_errors[0].column, "drift");

    let statics = single(&snapshot, "pg_static");
    assert_eq!(statics.label("short_version"), Some("10.1.0"));
    assert_eq!(statics.label("version"), Some("PostgreSQL 10.1 on x86_64-pc-linux-gnu"));
}

#[tokio::test]
async fn test_view_failure_is_isolated() {
    let db1 = server("PostgreSQL 10.1");
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1.clone()), catalog(), vec![DSN.to_string()], options());

    let snapshot = exporter.scrape().await;
    let result = &snapshot.results[0];

    assert_eq!(result.namespace_errors.len(), 1);
    assert_eq!(result.namespace_errors[0].namespace, "pg_broken");
    assert!(!find(&snapshot, "pg_test_numbackends").is_empty());

    // pg_old has no override for this version, so it is never queried.
    assert!(!db1.queries().iter().any(|q| q.contains("pg_old") || q.contains("AS y")));

    assert_eq!(single(&snapshot, "pg_up").value, 1.0);
    assert_eq!(single(&snapshot, "pg_exporter_last_scrape_error").value, 1.0);
    assert_eq!(single(&snapshot, "pg_exporter_scrapes_total").value, 1.0);
    assert_eq!(single(&snapshot, "pg_exporter_value_errors_total").value, 1.0);
}

#[tokio::test]
async fn test_version_gate_discards_columns() {
    let db1 = server("PostgreSQL 9.6.5");
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1.clone()), catalog(), vec![DSN.to_string()], options());

    let snapshot = exporter.scrape().await;
    assert!(find(&snapshot, "pg_test_new_col").is_empty());
    assert_eq!(single(&snapshot, "pg_static").label("short_version"), Some("9.6.5"));

    // After an upgrade the next scrape rebuilds the maps.
    db1.set_version("PostgreSQL 10.3");
    let snapshot = exporter.scrape().await;
    assert_eq!(find(&snapshot, "pg_test_new_col").len(), 2);
    assert_eq!(single(&snapshot, "pg_exporter_scrapes_total").value, 2.0);
}

#[tokio::test]
async fn test_unparsable_version_keeps_previous_maps() {
    let db1 = server("PostgreSQL 10.1");
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1.clone()), catalog(), vec![DSN.to_string()], options());
    let _ = exporter.scrape().await;

    db1.set_version("unknown build");
    let snapshot = exporter.scrape().await;
    let result = &snapshot.results[0];

    assert!(result.version_error.is_some());
    assert_eq!(find(&snapshot, "pg_test_new_col").len(), 2);
    assert!(find(&snapshot, "pg_static").is_empty());
    assert_eq!(single(&snapshot, "pg_exporter_last_scrape_error").value, 1.0);
}

#[tokio::test]
async fn test_soft_errors_do_not_abort_rows() {
    let db1 = FakeServer::new("PostgreSQL 12.0");
    db1.respond("SELECT * FROM pg_test;", test_rows("bogus"));
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1), catalog(), vec![DSN.to_string()], options());

    let snapshot = exporter.scrape().await;
    let result = &snapshot.results[0];

    let unmapped: Vec<_> = result
        .value_errors
        .iter()
        .filter(|e| matches!(e.error, CoercionError::Unmapped { .. }))
        .collect();
    assert_eq!(unmapped.len(), 1);
    assert_eq!(unmapped[0].namespace, "pg_test");

    // Later columns of the same row are still converted.
    assert_eq!(find(&snapshot, "pg_test_blk_time_milliseconds").len(), 1);
    assert_eq!(find(&snapshot, "pg_test_state").len(), 1);
    assert_eq!(single(&snapshot, "pg_exporter_value_errors_total").value, 2.0);
}

#[tokio::test]
async fn test_untyped_columns_can_be_suppressed() {
    let db1 = server("PostgreSQL 10.1");
    let options = ExporterOptions {
        emit_untyped_columns: false,
        ..options()
    };
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1), catalog(), vec![DSN.to_string()], options);

    let snapshot = exporter.scrape().await;
    assert!(find(&snapshot, "pg_test_drift").is_empty());
    assert!(snapshot.results[0].value_errors.is_empty());
}

#[tokio::test]
async fn test_connection_failures() {
    let db1 = server("PostgreSQL 10.1");
    let dsns = vec![DSN.to_string(), "host=db2 port=5432".to_string()];
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1), catalog(), dsns, options());

    let snapshot = exporter.scrape().await;
    assert!(snapshot.results[0].connected());
    assert!(!snapshot.results[1].connected());
    assert_eq!(single(&snapshot, "pg_up").value, 1.0);

    let exporter = Exporter::new(FakeConnector::new(), catalog(), vec![DSN.to_string()], options());
    let snapshot = exporter.scrape().await;
    assert!(snapshot.results[0].connection_error.is_some());
    assert_eq!(single(&snapshot, "pg_up").value, 0.0);
    assert_eq!(single(&snapshot, "pg_exporter_last_scrape_error").value, 1.0);
}

#[tokio::test]
async fn test_failed_probe_evicts_connection() {
    let db1 = server("PostgreSQL 10.1");
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1.clone()), catalog(), vec![DSN.to_string()], options());

    let _ = exporter.scrape().await;
    let _ = exporter.scrape().await;
    assert_eq!(db1.connects(), 1);
    assert_eq!(exporter.registry().len().await, 1);

    db1.set_ping_fails(true);
    let snapshot = exporter.scrape().await;
    assert!(!snapshot.results[0].connected());
    assert!(exporter.registry().is_empty().await);
    assert_eq!(db1.closes(), 1);

    db1.set_ping_fails(false);
    let snapshot = exporter.scrape().await;
    assert!(snapshot.results[0].connected());
    assert_eq!(db1.connects(), 2);

    exporter.close().await;
    exporter.close().await;
    assert_eq!(db1.closes(), 2);
}

#[tokio::test]
async fn test_constant_labels_everywhere() {
    let db1 = server("PostgreSQL 10.1");
    let options = ExporterOptions {
        constant_labels: BTreeMap::from([("environment".to_string(), "prod".to_string())]),
        ..options()
    };
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1), catalog(), vec![DSN.to_string()], options);

    let snapshot = exporter.scrape().await;
    for sample in snapshot.samples() {
        assert_eq!(sample.label("environment"), Some("prod"), "missing constant label on {}", sample.name);
    }

    // Target samples lead with the server label.
    let backends = find(&snapshot, "pg_test_numbackends");
    assert_eq!(backends[0].labels[0], ("server".to_string(), FINGERPRINT.to_string()));
}

#[tokio::test]
async fn test_settings_metrics() {
    let db1 = server("PostgreSQL 10.1");
    db1.add_setting("shared_buffers", "16384", "8kB", "integer");
    db1.add_setting("fsync", "on", "", "bool");
    db1.add_setting("mystery", "3", "parsecs", "integer");

    let options = ExporterOptions {
        disable_settings_metrics: false,
        ..options()
    };
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1), catalog(), vec![DSN.to_string()], options);

    let snapshot = exporter.scrape().await;
    assert_eq!(single(&snapshot, "pg_settings_shared_buffers_bytes").value, 134_217_728.0);
    assert_eq!(single(&snapshot, "pg_settings_fsync").value, 1.0);
    assert!(find(&snapshot, "pg_settings_mystery").is_empty());
    assert!(snapshot.results[0].value_errors.iter().any(|e| e.namespace == "pg_settings" && e.column == "mystery"));
}

#[tokio::test]
async fn test_disabled_default_metrics() {
    let db1 = server("PostgreSQL 10.1");
    let options = ExporterOptions {
        disable_default_metrics: true,
        ..options()
    };
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1.clone()), catalog(), vec![DSN.to_string()], options);

    let snapshot = exporter.scrape().await;
    assert!(find(&snapshot, "pg_static").is_empty());
    assert!(find(&snapshot, "pg_test_numbackends").is_empty());
    assert!(!db1.queries().iter().any(|q| q.contains("pg_test")));
    assert_eq!(single(&snapshot, "pg_up").value, 1.0);
}

#[tokio::test]
async fn test_discovery_expands_and_excludes() {
    let base = "postgresql://postgres@db1:5432/postgres";
    let db1 = server("PostgreSQL 10.1");
    db1.set_databases(&["postgres", "a", "b", "c"]);

    let connector = FakeConnector::new().with_server(FINGERPRINT, db1);
    let registry = Registry::new(connector, BTreeMap::new());

    let targets = discover_databases(&registry, &[base.to_string()], &["b".to_string()]).await;
    assert_eq!(
        targets,
        [
            base,
            "postgresql://postgres@db1:5432/a",
            "postgresql://postgres@db1:5432/c",
        ]
    );
}

#[tokio::test]
async fn test_discovery_failure_keeps_base() {
    let bases = ["host=down port=5432".to_string(), DSN.to_string()];
    let db1 = server("PostgreSQL 10.1");
    db1.set_databases(&["a"]);

    let registry = Registry::new(FakeConnector::new().with_server(FINGERPRINT, db1), BTreeMap::new());
    let targets = discover_databases(&registry, &bases, &[]).await;

    assert_eq!(targets, ["host=down port=5432", DSN, "host=db1 port=5432 user=postgres dbname=a"]);
}

#[tokio::test]
async fn test_scrape_with_discovery() {
    let base = "postgresql://postgres@db1:5432/postgres";
    let db1 = server("PostgreSQL 10.1");
    db1.set_databases(&["postgres", "app"]);

    let options = ExporterOptions {
        auto_discover_databases: true,
        ..options()
    };
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1), catalog(), vec![base.to_string()], options);

    let snapshot = exporter.scrape().await;
    let targets: Vec<_> = snapshot.results.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(targets, [base, "postgresql://postgres@db1:5432/app"]);
    assert_eq!(exporter.registry().len().await, 2);
}

const EXTENSION: &str = r#"
pg_replication:
  query: "SELECT 5 AS lag"
  metrics:
    - lag:
        usage: "GAUGE"
        description: "Replication lag behind master in seconds"
"#;

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
async fn test_extension_document_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("queries.yaml")).unwrap();
    std::fs::write(&path, EXTENSION).unwrap();

    let db1 = server("PostgreSQL 10.1");
    db1.respond("SELECT 5 AS lag", QueryResult::new(["lag"]).with_row([SqlValue::Int(5)]));

    let options = ExporterOptions {
        extend_query_path: Some(path.clone()),
        ..options()
    };
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1), catalog(), vec![DSN.to_string()], options);

    let snapshot = exporter.scrape().await;
    assert_eq!(single(&snapshot, "pg_replication_lag").value, 5.0);
    assert!(!find(&snapshot, "pg_test_numbackends").is_empty());

    let status = single(&snapshot, "pg_exporter_user_queries_load_error");
    assert_eq!(status.value, 0.0);
    assert_eq!(status.label("filename"), Some(path.as_str()));
    assert_eq!(status.label("hashsum"), Some(hashsum(EXTENSION.as_bytes()).as_str()));

    // A broken edit keeps the last document that parsed.
    let broken = "pg_replication: [unclosed";
    std::fs::write(&path, broken).unwrap();

    let snapshot = exporter.scrape().await;
    assert_eq!(single(&snapshot, "pg_replication_lag").value, 5.0);

    let status = single(&snapshot, "pg_exporter_user_queries_load_error");
    assert_eq!(status.value, 1.0);
    assert_eq!(status.label("hashsum"), Some(hashsum(broken.as_bytes()).as_str()));
}

#[tokio::test]
async fn test_scrape_loop_renders_each_cycle() {
    let db1 = server("PostgreSQL 10.1");
    let exporter = Exporter::new(FakeConnector::new().with_server(FINGERPRINT, db1), catalog(), vec![DSN.to_string()], options());

    let mut host = TestHost::new();
    let scrape_loop = ScrapeLoop {
        format: OutputFormat::Json,
        use_colors: false,
        interval: Some(Duration::from_millis(1)),
        count: Some(2),
    };
    run_scrape_loop(&mut host, &exporter, scrape_loop).await.unwrap();

    let output = host.output_str();
    let documents: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&output)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["targets"][0]["connected"], true);
    assert!(documents[1]["operational"].as_array().is_some_and(|ops| !ops.is_empty()));
}
