//! End-to-end tests over a real TCP listener.

use std::net::SocketAddr;
use std::time::Duration;

use site_gate::http::HttpServer;
use site_gate::lifecycle::Shutdown;
use tokio::net::TcpListener;

mod common;

async fn start_server(config: site_gate::SiteConfig) -> (SocketAddr, Shutdown, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).await;
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown, handle)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn serves_pages_and_fallback_over_tcp() {
    let dir = common::site_dir();
    let config = common::site_config(dir.path(), Duration::from_secs(60), 60);
    let (addr, shutdown, handle) = start_server(config).await;
    let client = client();

    let res = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("content-security-policy"));
    assert_eq!(
        res.headers()["cache-control"],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(res.text().await.unwrap(), "<h1>home</h1>");

    let res = client
        .get(format!("http://{}/does-not-exist.html", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.text().await.unwrap(), common::NOT_FOUND_PAGE);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not shut down")
        .unwrap();
}

#[tokio::test]
async fn concurrent_clients_never_exceed_quota() {
    let dir = common::site_dir();
    let quota = 50;
    let config = common::site_config(dir.path(), Duration::from_secs(60), quota);
    let (addr, shutdown, _handle) = start_server(config).await;

    let concurrency = 20;
    let requests_per_task = 5;
    let client = client();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}/style.css", addr);
        tasks.push(tokio::spawn(async move {
            let mut statuses = Vec::new();
            for _ in 0..requests_per_task {
                let res = client.get(&url).send().await.unwrap();
                statuses.push(res.status().as_u16());
            }
            statuses
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for task in tasks {
        for status in task.await.unwrap() {
            match status {
                200 => ok += 1,
                429 => limited += 1,
                other => panic!("unexpected status {other}"),
            }
        }
    }

    // Every request comes from 127.0.0.1, so they share one window.
    assert_eq!(ok, quota);
    assert_eq!(limited, concurrency * requests_per_task - quota);

    shutdown.trigger();
}
