//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;

use nat_webui::auth::UserTable;
use nat_webui::http::AppState;
use nat_webui::{ConsoleConfig, HttpServer, RuleStore, Shutdown};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "hunter2";

pub const SEED_RULES: &str = "\
# forwarded services
SINGLE,8080,8080,10.0.0.5
RANGE,9000,9010,10.0.0.6,udp
SINGLE,2222,2222,10.0.0.7,tcp
";

/// A console listening on an ephemeral port, backed by files in a temp dir.
pub struct TestConsole {
    pub addr: SocketAddr,
    pub dir: TempDir,
    pub store: Arc<RuleStore>,
    pub shutdown: Shutdown,
}

impl TestConsole {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Remove the directory holding the rule file so later writes fail.
    pub fn break_rules_dir(&self) {
        std::fs::remove_dir_all(self.dir.path().join("rules")).unwrap();
    }

    pub fn rules_file(&self) -> String {
        std::fs::read_to_string(self.store.path()).unwrap()
    }
}

impl Drop for TestConsole {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a console seeded with [`SEED_RULES`] and a single [`USERNAME`] account.
pub async fn start_console() -> TestConsole {
    start_console_with(SEED_RULES).await
}

pub async fn start_console_with(rules: &str) -> TestConsole {
    let dir = tempfile::tempdir().unwrap();
    let rules_dir = dir.path().join("rules");
    std::fs::create_dir(&rules_dir).unwrap();
    let rules_path = rules_dir.join("nat.conf");
    std::fs::write(&rules_path, rules).unwrap();

    let mut users = UserTable::default();
    users.set_password(USERNAME, PASSWORD, 4).unwrap();
    let passwd_path = dir.path().join("passwd.md");
    users.save(&passwd_path).unwrap();

    let mut config = ConsoleConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.rules.path = rules_path.clone();
    config.auth.passwd_path = passwd_path;

    let store = Arc::new(RuleStore::open(rules_path).await.unwrap());
    let state = AppState::new(&config, store.clone(), users);
    let server = HttpServer::new(config, state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestConsole {
        addr,
        dir,
        store,
        shutdown,
    }
}

/// Client that keeps cookies but does not follow redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Log in as the seeded account and return the authenticated client.
pub async fn logged_in_client(console: &TestConsole) -> reqwest::Client {
    let client = client();
    let res = client
        .post(console.url("/login"))
        .form(&[("username", USERNAME), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert!(res.status().is_redirection(), "login failed: {}", res.status());
    client
}
