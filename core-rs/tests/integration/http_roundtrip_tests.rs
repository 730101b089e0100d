// End-to-end tests: a real daemon on an ephemeral loopback port, driven
// through PaldClient and plain HTTP

use pald_core::config::DaemonConfig;
use pald_core::{PaldClient, PaldError, PortDaemon};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct RunningDaemon {
    addr: SocketAddr,
    state_file: PathBuf,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<pald_core::Result<()>>,
}

impl RunningDaemon {
    async fn start(dir: &TempDir, pool_min: u16, pool_max: u16) -> Self {
        let config = DaemonConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            pool_min,
            pool_max,
            state_file: dir.path().join("pald.dump"),
            throttle_ms: 1000,
        };
        let state_file = config.state_file.clone();

        let daemon = PortDaemon::new(config).unwrap();
        let listener = daemon.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(daemon.serve(listener, async move {
            let _ = stopped.await;
        }));

        RunningDaemon {
            addr,
            state_file,
            stop,
            handle,
        }
    }

    fn client(&self) -> PaldClient {
        PaldClient::new(self.addr.ip().to_string(), self.addr.port())
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    async fn stop(self) -> PathBuf {
        let _ = self.stop.send(());
        self.handle.await.unwrap().unwrap();
        self.state_file
    }
}

fn server_status(err: PaldError) -> (u16, String) {
    match err {
        PaldError::Server {
            status, message, ..
        } => (status, message),
        other => panic!("expected a server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_allocation_session() {
    let temp_dir = TempDir::new().unwrap();
    let daemon = RunningDaemon::start(&temp_dir, 49200, 49202).await;

    {
        let client = daemon.client();

        assert_eq!(client.set("a0").await.unwrap(), 49200);
        assert_eq!(client.set("a1").await.unwrap(), 49201);

        let (status, message) = server_status(client.get("a2").await.unwrap_err());
        assert_eq!(status, 404);
        assert_eq!(message, "Name \"a2\" not found in the port registry");

        assert_eq!(client.set("a2").await.unwrap(), 49202);
        assert_eq!(client.get("a1").await.unwrap(), 49201);

        let (status, message) = server_status(client.set("a2").await.unwrap_err());
        assert_eq!(status, 412);
        assert!(message.starts_with("Name \"a2\" is already taken"));

        client.del(49201).await.unwrap();
        assert_eq!(client.set("a3").await.unwrap(), 49201);

        let (status, message) = server_status(client.set("a4").await.unwrap_err());
        assert_eq!(status, 412);
        assert!(message.starts_with("No ports available"));
    }

    let state_file = daemon.stop().await;
    assert_eq!(
        fs::read_to_string(state_file).unwrap(),
        "a0\t49200\t\na3\t49201\t\na2\t49202\t\n"
    );
}

#[tokio::test]
async fn test_bad_requests() {
    let temp_dir = TempDir::new().unwrap();
    let daemon = RunningDaemon::start(&temp_dir, 49200, 49202).await;

    let cases = [
        ("/set?svc=er", "Service name is missing"),
        ("/get?svc=er", "Service name is missing"),
        ("/del?port=492O1", "Invalid port"),
        ("/set?sevice=er", "Service name is missing"),
        ("/del?svc=er", "Port number is missing"),
    ];

    for (request, prefix) in cases {
        let response = reqwest::get(daemon.url(request)).await.unwrap();
        assert_eq!(response.status().as_u16(), 400, "status for {}", request);
        let body = response.text().await.unwrap();
        assert!(body.starts_with(prefix), "body {:?} for {}", body, request);
    }

    daemon.stop().await;
}

#[tokio::test]
async fn test_fixed_ports_and_addresses_persist_across_restart() {
    let temp_dir = TempDir::new().unwrap();

    let daemon = RunningDaemon::start(&temp_dir, 49201, 49299).await;
    {
        let client = daemon.client();
        client
            .fix_with_addresses("pald", 1001, &["127.0.0.1", "::1"])
            .await
            .unwrap();
        assert_eq!(
            client.set_with_addresses("web", &["0.0.0.0"]).await.unwrap(),
            49201
        );

        let (status, _) = server_status(client.fix("other", 1001).await.unwrap_err());
        assert_eq!(status, 412);
    }
    daemon.stop().await;

    let daemon = RunningDaemon::start(&temp_dir, 49201, 49299).await;
    {
        let client = daemon.client();
        assert_eq!(client.get("pald").await.unwrap(), 1001);
        assert_eq!(client.get("web").await.unwrap(), 49201);
        assert_eq!(client.set("api").await.unwrap(), 49202);
    }
    let state_file = daemon.stop().await;

    assert_eq!(
        fs::read_to_string(state_file).unwrap(),
        "pald\t1001\t127.0.0.1,::1\nweb\t49201\t0.0.0.0\napi\t49202\t\n"
    );
}
