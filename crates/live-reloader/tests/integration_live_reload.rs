//! End-to-end live reload over a real socket.
//!
//! File watcher -> debouncer -> registry -> SSE client, plus the serve-only
//! mode used when the watcher cannot start.

use live_reloader::cli::ServeArgs;
use live_reloader::commands::serve;
use live_reloader::dev::{server, DevConfig, FileWatcher, ReceiverRegistry};
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, timeout_at, Duration, Instant};

struct Running {
    addr: SocketAddr,
    registry: Arc<ReceiverRegistry>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<live_reloader::Result<()>>,
}

fn site() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("index.html"), "<body>v1</body>").unwrap();
    fs::write(temp.path().join("about.html"), "<body>about</body>").unwrap();
    temp
}

fn config(site: &TempDir) -> DevConfig {
    DevConfig::from_args(&ServeArgs {
        root: Some(site.path().to_path_buf()),
        port: 3000,
        host: "127.0.0.1".to_string(),
        debounce_ms: 75,
    })
    .unwrap()
}

async fn start(config: DevConfig, watch: serve::WatchSetup) -> Running {
    let listener = server::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(ReceiverRegistry::new());
    let (stop, stopped) = oneshot::channel::<()>();

    let task = tokio::spawn(serve::run(
        config,
        listener,
        watch,
        Arc::clone(&registry),
        async move {
            let _ = stopped.await;
        },
    ));

    Running {
        addr,
        registry,
        stop,
        task,
    }
}

async fn stop(running: Running) {
    let _ = running.stop.send(());
    timeout(Duration::from_secs(5), running.task)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

async fn request(addr: SocketAddr, head: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(head.as_bytes()).await.unwrap();
    stream
}

/// Read until `needle` shows up in what was received since the last call.
async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut received = String::new();
    let mut buf = [0u8; 1024];
    let deadline = Instant::now() + Duration::from_secs(5);

    while !received.contains(needle) {
        let n = timeout_at(deadline, stream.read(&mut buf))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}; got {received:?}"))
            .unwrap();
        assert!(n > 0, "connection closed before {needle:?}; got {received:?}");
        received.push_str(&String::from_utf8_lossy(&buf[..n]));
    }

    received
}

async fn wait_for_clients(registry: &ReceiverRegistry, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while registry.len() != expected {
        assert!(
            Instant::now() < deadline,
            "expected {expected} client(s), found {}",
            registry.len()
        );
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_file_change_reloads_connected_page() {
    let site = site();
    let config = config(&site);
    let watch = FileWatcher::new(config.root.path().to_path_buf());
    let running = start(config, watch).await;

    let mut client = request(
        running.addr,
        "GET /__reload HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await;

    let head = read_until(&mut client, "retry").await;
    assert!(head.contains("200 OK"));
    assert!(head.contains("text/event-stream"));
    wait_for_clients(&running.registry, 1).await;

    fs::write(site.path().join("index.html"), "<body>v2</body>").unwrap();

    let event = read_until(&mut client, "reload").await;
    assert!(event.contains("data"), "unexpected event: {event:?}");

    drop(client);
    wait_for_clients(&running.registry, 0).await;

    stop(running).await;
}

#[tokio::test]
async fn test_burst_of_changes_sends_one_reload() {
    let site = site();
    let config = config(&site);
    let watch = FileWatcher::new(config.root.path().to_path_buf());
    let running = start(config, watch).await;

    let mut client = request(
        running.addr,
        "GET /__reload HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await;
    read_until(&mut client, "retry").await;
    wait_for_clients(&running.registry, 1).await;

    for i in 0..5 {
        fs::write(site.path().join("about.html"), format!("<body>{i}</body>")).unwrap();
    }
    read_until(&mut client, "reload").await;

    // Nothing else arrives once the burst has been flushed.
    let mut buf = [0u8; 256];
    let extra = timeout(Duration::from_millis(500), client.read(&mut buf)).await;
    assert!(extra.is_err(), "unexpected second frame");

    drop(client);
    stop(running).await;
}

#[tokio::test]
async fn test_failed_watcher_still_serves_files() {
    let site = site();
    let config = config(&site);
    let watch = FileWatcher::new(site.path().join("not-a-dir"));
    assert!(watch.is_err());
    let running = start(config, watch).await;

    let mut client = request(
        running.addr,
        "GET /about HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    let mut response = String::new();
    timeout(Duration::from_secs(5), client.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("<body>about<script>"));

    // Reload streams still open; they just never fire.
    let mut sse = request(
        running.addr,
        "GET /__reload HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await;
    read_until(&mut sse, "retry").await;
    fs::write(site.path().join("about.html"), "<body>changed</body>").unwrap();

    let mut buf = [0u8; 256];
    let extra = timeout(Duration::from_millis(500), sse.read(&mut buf)).await;
    assert!(extra.is_err(), "reload sent without a watcher");

    drop(sse);
    stop(running).await;
}
