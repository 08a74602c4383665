//! Test server management: spawns `verlicored` as a child process against a
//! throwaway config and database, the way slircd-ng's harness spawns its
//! own binary rather than driving the core in-process.

use std::net::TcpStream;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;

pub struct TestServer {
    child: Child,
    port: u16,
    data_dir: PathBuf,
}

impl TestServer {
    /// Spawn a new test server listening on `port`.
    pub fn spawn(port: u16) -> anyhow::Result<Self> {
        let data_dir = std::env::temp_dir().join(format!("verlicore-test-{port}"));
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join("config.toml");
        let config_content = format!(
            r#"
[server]
hub_name = "Test Hub"
hub_description = "integration test hub"
listen_addr = "127.0.0.1"
listen_port = {port}
send_nicklist_on_login = true
send_oplist_on_login = true

[security]
clone_detect_count = 100
pwd_tmpban_secs = 2

[timeouts]
key_secs = 30
valnick_secs = 30
login_secs = 30
myinfo_secs = 30

[db]
path = "{db_path}/test.db"
"#,
            db_path = data_dir.display()
        );

        std::fs::write(&config_path, config_content)?;

        let cargo_manifest_dir = env!("CARGO_MANIFEST_DIR");
        let binary_path = PathBuf::from(cargo_manifest_dir).join("target/debug/verlicored");

        let child = Command::new(&binary_path)
            .arg("-c")
            .arg(config_path.to_str().unwrap())
            .spawn()?;

        let server = Self { child, port, data_dir };
        server.wait_until_ready()?;
        Ok(server)
    }

    fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(("127.0.0.1", self.port)).is_ok() {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        anyhow::bail!("server failed to start within 5 seconds")
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn connect(&self, nick: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address(), nick)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}
