#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use feria_api::auth::{Role, SystemClock, TokenCodec, TokenSubject};
use reqwest::StatusCode;

pub const JWT_SECRET: &str = "feria-integration-secret-0123456789";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Without DATABASE_URL in the environment the pool points at a closed
        // port; routes that never reach the store still answer normally.
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://feria@127.0.0.1:1/feria_test".to_string());

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_feria-api"));
        cmd.env("PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("JWT_SECRET", JWT_SECRET)
            .env("DATABASE_URL", database_url)
            .env("DATABASE_ACQUIRE_TIMEOUT_SECS", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// Session token the spawned server will accept, signed with the shared secret.
pub fn session_token(id: i64, role: Role) -> String {
    signed(id, role, chrono::Duration::hours(2))
}

pub fn signed(id: i64, role: Role, ttl: chrono::Duration) -> String {
    let codec = TokenCodec::new(JWT_SECRET, Arc::new(SystemClock));
    let subject = TokenSubject {
        id,
        username: format!("user{}", id),
        email: format!("user{}@feria.test", id),
        role,
    };
    codec.sign(&subject, None, Some(ttl)).expect("sign test token").token
}
