use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let log_dir: PathBuf = std::env::temp_dir().join(format!("vbr-gateway-test-{}", port));
        std::fs::create_dir_all(&log_dir).context("failed to create audit log dir")?;

        // The identity provider is never reached by these tests: /status is
        // public and unauthenticated /status/auth is rejected locally.
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_vbr-gateway"));
        cmd.env("VBR_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("AUDIT_SINK", "file")
            .env("APP_LOG_PATH", &log_dir)
            .env("TAPIS_BASE_URL", "http://127.0.0.1:9")
            .env("TAPIS_TENANT_ID", "tacc")
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
            let url = format!("{}/status", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn audit_log(&self) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vbr-gateway-test-{}", self.port))
            .join("audit.log")
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
