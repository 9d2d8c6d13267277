//! Discovery against an HTTP origin.
//!
//! A wiremock server stands in for the site. Unmatched requests answer 404,
//! so only the mounted images exist.

use impressions::config::{DiscoveryConfig, ProbeConfig, ProbeStrategy, SiteConfig};
use impressions::discover::{DiscoverPlan, StopReason, discover, discover_batch};
use impressions::memo::{Memo, MemoPolicy};
use impressions::probe::{HttpProber, ProbeKind, Prober};
use impressions::session::Session;
use impressions::site::SiteRoot;
use std::io::Cursor;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "assets/img/impressions/";

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::new(2, 2);
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn root(server: &MockServer) -> Url {
    Url::parse(&format!("{}/", server.uri())).unwrap()
}

fn plan(max_index: u32) -> DiscoverPlan {
    DiscoverPlan::from_config(&DiscoveryConfig {
        max_index,
        ..DiscoveryConfig::default()
    })
    .unwrap()
}

async fn mount_head(server: &MockServer, name: &str) {
    Mock::given(method("HEAD"))
        .and(path(format!("/{BASE}{name}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn mount_get(server: &MockServer, name: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/{BASE}{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

async fn reject_head(server: &MockServer) {
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(server)
        .await;
}

// ===========================================================================
// HEAD probing
// ===========================================================================

#[tokio::test]
async fn head_probes_find_contiguous_set() {
    let server = MockServer::start().await;
    for i in 1..=3 {
        mount_head(&server, &format!("impression-{i}.jpg")).await;
    }
    let prober = HttpProber::new(root(&server), &ProbeConfig::default());

    let result = discover(&prober, BASE, &plan(20), None).await;

    assert_eq!(
        result.images,
        vec![
            format!("{BASE}impression-1.jpg"),
            format!("{BASE}impression-2.jpg"),
            format!("{BASE}impression-3.jpg"),
        ]
    );
    assert_eq!(result.stop, StopReason::MissLimit { at: 7 });
    assert_eq!(prober.kind().await, ProbeKind::Head);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "HEAD"));
}

#[tokio::test]
async fn missing_image_is_a_miss() {
    let server = MockServer::start().await;
    let prober = HttpProber::new(root(&server), &ProbeConfig::default());
    assert!(!prober.exists(&format!("{BASE}impression-1.jpg")).await);
}

// ===========================================================================
// Load fallback
// ===========================================================================

#[tokio::test]
async fn rejected_head_switches_to_load() {
    let server = MockServer::start().await;
    reject_head(&server).await;
    mount_get(&server, "impression-1.png", png_bytes()).await;
    mount_get(&server, "impression-2.png", png_bytes()).await;
    let prober = HttpProber::new(root(&server), &ProbeConfig::default());

    let result = discover(&prober, BASE, &plan(10), None).await;

    assert_eq!(prober.kind().await, ProbeKind::Load);
    assert_eq!(
        result.images,
        vec![
            format!("{BASE}impression-1.png"),
            format!("{BASE}impression-2.png"),
        ]
    );

    // One capability probe, then only GETs
    let requests = server.received_requests().await.unwrap();
    let heads = requests
        .iter()
        .filter(|r| r.method.as_str() == "HEAD")
        .count();
    assert_eq!(heads, 1);
}

#[tokio::test]
async fn load_rejects_non_image_bodies() {
    let server = MockServer::start().await;
    reject_head(&server).await;
    // A server that answers every path with its index page
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>home</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    let prober = HttpProber::new(root(&server), &ProbeConfig::default());

    let result = discover(&prober, BASE, &plan(3), None).await;
    assert!(result.images.is_empty());
    assert_eq!(result.stop, StopReason::Exhausted);
}

#[tokio::test]
async fn load_decodes_header_of_large_body() {
    let server = MockServer::start().await;
    reject_head(&server).await;
    let mut body = png_bytes();
    body.resize(body.len() + 4 * 1024 * 1024, 0);
    mount_get(&server, "impression-1.png", body).await;
    let prober = HttpProber::new(root(&server), &ProbeConfig::default());

    assert!(prober.exists(&format!("{BASE}impression-1.png")).await);
}

#[tokio::test]
async fn forced_load_strategy_skips_capability_probe() {
    let server = MockServer::start().await;
    mount_get(&server, "1.webp", png_bytes()).await;
    let config = ProbeConfig {
        strategy: ProbeStrategy::Load,
        ..ProbeConfig::default()
    };
    let prober = HttpProber::new(root(&server), &config);

    assert!(prober.exists(&format!("{BASE}1.webp")).await);
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

// ===========================================================================
// Batch and session
// ===========================================================================

#[tokio::test]
async fn batch_discovery_matches_sequential() {
    let server = MockServer::start().await;
    for i in 1..=6 {
        mount_head(&server, &format!("impression-{i}.webp")).await;
    }
    let prober = HttpProber::new(root(&server), &ProbeConfig::default());

    let sequential = discover(&prober, BASE, &plan(30), None).await;
    let batched = discover_batch(&prober, BASE, &plan(30), 4, None).await;
    assert_eq!(sequential.images.len(), 6);
    assert_eq!(sequential.images, batched.images);
}

#[tokio::test]
async fn session_memoizes_remote_discovery() {
    let server = MockServer::start().await;
    mount_head(&server, "impression-1.jpg").await;
    let root = SiteRoot::parse(&server.uri()).unwrap();
    let mut config = SiteConfig::default();
    config.discovery.max_index = 10;
    let prober = impressions::probe::prober_for(&root, &config.probe);
    let mut session =
        Session::new(root, config, prober, Memo::in_memory(MemoPolicy::default())).unwrap();

    let first = session.banner_images().await;
    let requests_after_first = server.received_requests().await.unwrap().len();
    let second = session.banner_images().await;

    assert_eq!(first, vec![format!("{BASE}impression-1.jpg")]);
    assert_eq!(first, second);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );
    assert_eq!(session.stats().hits, 1);
}
