//! End-to-end tests for the live HLS proxy.
//!
//! Starts a real Axum server on a random port with every origin pointed at
//! a wiremock instance, then drives the full master → variant → segment
//! chain over HTTP.

use std::net::SocketAddr;
use tubecast::config::Config;
use tubecast::server::build_router;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test server helpers ───────────────────────────────────────────────────────

/// Spin up the proxy with all page origins pointed at `origin`.
///
/// Binds a listener first to discover the random port, then sets `base_url`
/// to it so rewritten playlist links point back at the proxy itself.
async fn start_proxy(origin: &str) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();

    let config = Config {
        port: 0,
        base_url: format!("http://{}", addr),
        is_dev: true,
        page_origin: origin.to_string(),
        mobile_origin: origin.to_string(),
        fallback_origins: vec![origin.to_string()],
        page_timeout_secs: 2,
        segment_timeout_secs: 2,
        // wiremock binds on loopback; the SSRF guard must let the test
        // origin through
        allow_private_targets: true,
    };

    let app = build_router(config);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

// ── Master mode ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn master_flow_resolves_and_rewrites() {
    let origin = MockServer::start().await;

    // First candidate page carries the manifest URL.
    Mock::given(method("GET"))
        .and(path("/@chan/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><script>var cfg = {{"hlsManifestUrl":"{}/master.m3u8"}};</script></html>"#,
            origin.uri()
        )))
        .expect(1)
        .mount(&origin)
        .await;

    Mock::given(method("GET"))
        .and(path("/master.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000\n{}/v1.m3u8\n",
            origin.uri()
        )))
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{}/@chan/stream.m3u8", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-store, no-cache, must-revalidate, max-age=0"
    );

    let body = resp.text().await.unwrap();
    let expected_link = format!(
        "http://{}/@chan/stream.m3u8?variant={}",
        addr,
        urlencoding::encode(&format!("{}/v1.m3u8", origin.uri()))
    );
    assert!(
        body.contains(&expected_link),
        "rewritten master should carry the proxy variant link, got:\n{body}"
    );
    assert!(body.contains("#EXT-X-STREAM-INF:BANDWIDTH=800000"));
}

#[tokio::test]
async fn master_debug_dump() {
    let origin = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/@chan/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#""hlsManifestUrl":"{}/master.m3u8""#,
            origin.uri()
        )))
        .mount(&origin)
        .await;

    Mock::given(method("GET"))
        .and(path("/master.m3u8"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("#EXTM3U\nhttps://cdn.example/v1.m3u8\n"),
        )
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{}/@chan/stream.m3u8?debug=1", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains("source_manifest"));
    assert!(body.contains("encrypted: false"));
    assert!(body.contains("--- rewritten ---"));
    // the dump carries both the original URL and its rewritten form
    assert!(body.contains("https://cdn.example/v1.m3u8"));
    assert!(body.contains("?variant=https%3A%2F%2Fcdn.example%2Fv1.m3u8"));
}

#[tokio::test]
async fn master_falls_back_to_watch_page() {
    let origin = MockServer::start().await;

    // Only the watch-page shape answers; earlier candidates 404 and are
    // skipped without retry.
    Mock::given(method("GET"))
        .and(path("/watch"))
        .and(query_param("v", "vid123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#""hlsManifestUrl":"{}/master.m3u8""#,
            origin.uri()
        )))
        .mount(&origin)
        .await;

    Mock::given(method("GET"))
        .and(path("/master.m3u8"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("#EXTM3U\nhttps://cdn.example/v1.m3u8\n"),
        )
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{}/vid123/stream.m3u8", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("?variant=https%3A%2F%2Fcdn.example%2Fv1.m3u8"));
}

#[tokio::test]
async fn master_exhausted_candidates_yield_404() {
    // Origin answers 404 to everything.
    let origin = MockServer::start().await;
    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{}/@ghost/stream.m3u8", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Last error"), "got: {body}");
    assert!(body.contains("404"));
}

// ── Variant mode ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn variant_flow_rewrites_segments() {
    let origin = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/v1.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTINF:6\nseg1.ts\n"))
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let variant_url = format!("{}/live/v1.m3u8", origin.uri());
    let resp = client
        .get(format!(
            "http://{}/@chan/stream.m3u8?variant={}",
            addr,
            urlencoding::encode(&variant_url)
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    let expected_link = format!(
        "http://{}/@chan/stream.m3u8?url={}",
        addr,
        urlencoding::encode(&format!("{}/live/seg1.ts", origin.uri()))
    );
    assert!(body.starts_with("#EXTINF:6\n"));
    assert!(
        body.contains(&expected_link),
        "rewritten variant should carry the proxy segment link, got:\n{body}"
    );
}

#[tokio::test]
async fn proxy_links_preserve_encoded_path_segments() {
    let origin = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTINF:6\nseg1.ts\n"))
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    // channel segment with a percent-encoded space
    let resp = client
        .get(format!(
            "http://{}/one%20two/stream.m3u8?variant={}",
            addr,
            urlencoding::encode(&format!("{}/v1.m3u8", origin.uri()))
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(
        body.contains(&format!("http://{}/one%20two/stream.m3u8?url=", addr)),
        "rewritten links must keep the path encoded, got:\n{body}"
    );
}

#[tokio::test]
async fn variant_debug_dump() {
    let origin = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXT-X-KEY:METHOD=AES-128,URI=\"key\"\n#EXTINF:6\nseg1.ts\n",
        ))
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let variant_url = format!("{}/v1.m3u8", origin.uri());
    let resp = client
        .get(format!(
            "http://{}/@chan/stream.m3u8?variant={}&debug=1",
            addr,
            urlencoding::encode(&variant_url)
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains("variant_source"));
    assert!(body.contains("encrypted: true"));
    assert!(body.contains("--- rewritten ---"));
}

#[tokio::test]
async fn variant_upstream_failure_is_502() {
    let origin = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone.m3u8"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!(
            "http://{}/@chan/stream.m3u8?variant={}",
            addr,
            urlencoding::encode(&format!("{}/gone.m3u8", origin.uri()))
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 502);
}

// ── Segment mode ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn segment_streams_body_and_headers() {
    let origin = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/seg1.ts"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "video/mp2t")
                .set_body_bytes(b"SEGMENTDATA".to_vec()),
        )
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!(
            "http://{}/@chan/stream.m3u8?url={}",
            addr,
            urlencoding::encode(&format!("{}/seg1.ts", origin.uri()))
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "video/mp2t");
    assert_eq!(resp.headers().get("accept-ranges").unwrap(), "bytes");
    assert_eq!(resp.headers().get("vary").unwrap(), "Origin");
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-store, no-cache, must-revalidate, max-age=0"
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"SEGMENTDATA");
}

#[tokio::test]
async fn segment_range_request_passes_206_through() {
    let origin = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/seg1.ts"))
        .and(header("Range", "bytes=0-3"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes 0-3/11")
                .set_body_bytes(b"SEGM".to_vec()),
        )
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!(
            "http://{}/@chan/stream.m3u8?url={}",
            addr,
            urlencoding::encode(&format!("{}/seg1.ts", origin.uri()))
        ))
        .header("Range", "bytes=0-3")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    assert_eq!(
        resp.headers().get("content-range").unwrap(),
        "bytes 0-3/11"
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"SEGM");
}

#[tokio::test]
async fn segment_blocked_upstream_retried_then_502() {
    let origin = MockServer::start().await;

    // Blocked on every attempt; the relay tries exactly 3 times.
    Mock::given(method("GET"))
        .and(path("/blocked.ts"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!(
            "http://{}/@chan/stream.m3u8?url={}",
            addr,
            urlencoding::encode(&format!("{}/blocked.ts", origin.uri()))
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 502);
    let body = resp.text().await.unwrap();
    assert!(body.contains("blocked"), "got: {body}");
}

#[tokio::test]
async fn segment_mode_wins_over_variant_mode() {
    let origin = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/seg1.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"DATA".to_vec()))
        .expect(1)
        .mount(&origin)
        .await;

    let addr = start_proxy(&origin.uri()).await;
    let client = reqwest::Client::new();

    // Both params present: `url` must win, `variant` is never fetched.
    let resp = client
        .get(format!(
            "http://{}/@chan/stream.m3u8?variant={}&url={}",
            addr,
            urlencoding::encode(&format!("{}/v1.m3u8", origin.uri())),
            urlencoding::encode(&format!("{}/seg1.ts", origin.uri()))
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"DATA");
}
