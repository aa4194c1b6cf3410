//! End-to-end pipeline regression: build → upload → serve.
//!
//! Runs a real deploy into an in-memory object store, puts a real
//! storage frontend and the edge proxy on local ports, and fetches the
//! published site through `{project}.{domain}` hostnames.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::watch;

use skylift_core::{BuildJob, ProjectId};
use skylift_deploy::{DeployPhase, DeployRegistry, orchestrator_with};
use skylift_logs::LogBroker;
use skylift_proxy::EdgeProxy;
use skylift_store::MemoryObjectStore;

/// Minimal storage frontend: GET `/__outputs/{*key}` straight out of
/// the in-memory store, with the stored content type.
async fn serve_object(
    State(store): State<MemoryObjectStore>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    match store.get(&format!("__outputs/{key}")) {
        Some(obj) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, obj.content_type)],
            obj.body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "no such object").into_response(),
    }
}

async fn spawn_storage(store: MemoryObjectStore) -> SocketAddr {
    let app = Router::new()
        .route("/__outputs/{*key}", get(serve_object))
        .with_state(store);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_proxy(storage_addr: SocketAddr) -> (SocketAddr, watch::Sender<bool>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let proxy = EdgeProxy::new(addr, format!("http://{storage_addr}/__outputs"));
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        proxy.serve_on(listener, rx).await.unwrap();
    });
    (addr, tx)
}

/// Deploy a two-file site for `project` into `store`.
async fn deploy_site(store: &MemoryObjectStore, project: &str, tag: &str) {
    let source_dir = std::env::temp_dir().join(format!(
        "skyliftd-pipeline-{tag}-{project}-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&source_dir);
    std::fs::create_dir_all(&source_dir).unwrap();

    let broker = LogBroker::new();
    let orchestrator = orchestrator_with(
        Arc::new(store.clone()),
        broker,
        DeployRegistry::new(),
        4,
    );

    let command = format!(
        "mkdir -p build/assets \
         && printf '<html>{project} home</html>' > build/index.html \
         && printf 'body{{}}' > build/assets/site.css"
    );
    let job = BuildJob::new(ProjectId::parse(project).unwrap(), &source_dir, command);
    let phase = orchestrator.deploy(job, &source_dir.join("build")).await;
    assert_eq!(phase, DeployPhase::Succeeded);

    let _ = std::fs::remove_dir_all(&source_dir);
}

#[tokio::test]
async fn published_site_is_served_through_its_subdomain() {
    let store = MemoryObjectStore::new();
    deploy_site(&store, "p1", "serve").await;

    let storage_addr = spawn_storage(store).await;
    let (proxy_addr, _shutdown) = spawn_proxy(storage_addr).await;

    let client = reqwest::Client::new();

    // Bare `/` rewrites to /index.html.
    let resp = client
        .get(format!("http://{proxy_addr}/"))
        .header(header::HOST, "p1.sites.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/html")
    );
    assert_eq!(resp.text().await.unwrap(), "<html>p1 home</html>");

    // Every other path passes through unchanged.
    let resp = client
        .get(format!("http://{proxy_addr}/assets/site.css"))
        .header(header::HOST, "p1.sites.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "body{}");
}

#[tokio::test]
async fn projects_do_not_leak_across_subdomains() {
    let store = MemoryObjectStore::new();
    deploy_site(&store, "p1", "leak").await;

    let storage_addr = spawn_storage(store).await;
    let (proxy_addr, _shutdown) = spawn_proxy(storage_addr).await;

    let client = reqwest::Client::new();

    // p2 never deployed: upstream 404 passes through untouched.
    let resp = client
        .get(format!("http://{proxy_addr}/"))
        .header(header::HOST, "p2.sites.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dotless_host_is_rejected_at_the_edge() {
    let store = MemoryObjectStore::new();
    let storage_addr = spawn_storage(store).await;
    let (proxy_addr, _shutdown) = spawn_proxy(storage_addr).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{proxy_addr}/"))
        .header(header::HOST, "localhost")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn redeploy_overwrites_the_same_keys() {
    let store = MemoryObjectStore::new();
    deploy_site(&store, "p1", "redeploy").await;
    let first = store.keys();
    deploy_site(&store, "p1", "redeploy").await;

    // Same key set, last write wins: no versioned copies appeared.
    assert_eq!(store.keys(), first);
}
