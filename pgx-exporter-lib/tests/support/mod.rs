//! In-memory stand-ins for PostgreSQL servers and the process host.

#![expect(dead_code, reason = "each test binary uses a different subset")]

use ohno::app_err;
use pgx_exporter_lib::Host;
use pgx_exporter_lib::exporter::{Connector, QueryResult, Session, Target};
use pgx_exporter_lib::values::SqlValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Result<T> = pgx_exporter_lib::Result<T>;

/// Test host that captures output to in-memory buffers.
pub struct TestHost {
    pub output_buf: Vec<u8>,
    pub error_buf: Vec<u8>,
    pub exit_code: Option<i32>,
}

impl TestHost {
    pub const fn new() -> Self {
        Self {
            output_buf: Vec::new(),
            error_buf: Vec::new(),
            exit_code: None,
        }
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }

    pub fn error_str(&self) -> String {
        String::from_utf8_lossy(&self.error_buf).into_owned()
    }
}

impl Host for TestHost {
    fn output(&mut self) -> impl std::io::Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl std::io::Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}

#[derive(Default)]
struct ServerState {
    version: String,
    databases: Vec<String>,
    settings: Vec<[String; 5]>,
    responses: HashMap<String, QueryResult>,
    ping_fails: bool,
    queries: Vec<String>,
    connects: usize,
    closes: usize,
}

/// A scripted server. Clones share state.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<ServerState>>,
}

impl FakeServer {
    pub fn new(version: &str) -> Self {
        let server = Self::default();
        server.set_version(version);
        server
    }

    pub fn set_version(&self, version: &str) {
        self.state.lock().unwrap().version = version.to_string();
    }

    pub fn set_databases(&self, databases: &[&str]) {
        self.state.lock().unwrap().databases = databases.iter().map(ToString::to_string).collect();
    }

    pub fn add_setting(&self, name: &str, setting: &str, unit: &str, vartype: &str) {
        self.state.lock().unwrap().settings.push([
            name.to_string(),
            setting.to_string(),
            unit.to_string(),
            format!("Description of {name}"),
            vartype.to_string(),
        ]);
    }

    /// Answer `sql` with `result`. Queries without a response fail.
    pub fn respond(&self, sql: &str, result: QueryResult) {
        let _ = self.state.lock().unwrap().responses.insert(sql.to_string(), result);
    }

    pub fn set_ping_fails(&self, fails: bool) {
        self.state.lock().unwrap().ping_fails = fails;
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    fn answer(&self, sql: &str) -> Result<QueryResult> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(sql.to_string());

        if sql == "SELECT version();" {
            return Ok(QueryResult::new(["version"]).with_row([SqlValue::from(state.version.as_str())]));
        }

        if sql.starts_with("SELECT datname FROM pg_database") {
            let mut result = QueryResult::new(["datname"]);
            for db in &state.databases {
                result = result.with_row([SqlValue::from(db.as_str())]);
            }
            return Ok(result);
        }

        if sql.contains("FROM pg_settings") {
            let mut result = QueryResult::new(["name", "setting", "coalesce", "short_desc", "vartype"]);
            for row in &state.settings {
                result = result.with_row(row.iter().map(|v| SqlValue::from(v.as_str())));
            }
            return Ok(result);
        }

        state
            .responses
            .get(sql)
            .cloned()
            .ok_or_else(|| app_err!("relation does not exist: {sql}"))
    }
}

pub struct FakeSession {
    server: FakeServer,
}

impl Session for FakeSession {
    async fn ping(&self) -> Result<()> {
        if self.server.state.lock().unwrap().ping_fails {
            return Err(app_err!("server closed the connection unexpectedly"));
        }
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<QueryResult> {
        self.server.answer(sql)
    }

    fn close(&self) {
        self.server.state.lock().unwrap().closes += 1;
    }
}

/// Connects to fake servers by fingerprint. Unknown fingerprints refuse the connection.
#[derive(Clone, Default)]
pub struct FakeConnector {
    servers: HashMap<String, FakeServer>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_server(mut self, fingerprint: &str, server: FakeServer) -> Self {
        let _ = self.servers.insert(fingerprint.to_string(), server);
        self
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, target: &Target) -> Result<FakeSession> {
        let server = self
            .servers
            .get(target.fingerprint())
            .cloned()
            .ok_or_else(|| app_err!("connection refused"))?;
        server.state.lock().unwrap().connects += 1;
        Ok(FakeSession { server })
    }
}
