//! HTTP routes over a real index, exercised through a raw TCP client.

mod common;

use common::{PNG_BYTES, write_file, write_zip};
use gallery_preview::classify::Classifier;
use gallery_preview::config::BrowseConfig;
use gallery_preview::index::GroupIndex;
use gallery_preview::serve::{AppState, build_router};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

struct Response {
    status: u16,
    head: String,
    body: Vec<u8>,
}

impl Response {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

async fn send_raw(addr: SocketAddr, path: &str) -> Response {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read response");
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("http response separator");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    Response {
        status,
        head,
        body: raw[split + 4..].to_vec(),
    }
}

async fn spawn_server(index: GroupIndex, browse: BrowseConfig) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(AppState::new(Arc::new(index), browse));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn fixture() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let gallery = tmp.path().join("gallery");
    write_file(&gallery.join("catA/a.png"), PNG_BYTES);
    write_file(&gallery.join("catA/b.png"), b"b pixels");
    write_file(&gallery.join("photo.jpg"), b"jpeg-ish");
    write_zip(&gallery.join("bundle.zip"), &[("sub/c.png", PNG_BYTES)]);
    (tmp, gallery)
}

fn build(gallery: &Path) -> GroupIndex {
    GroupIndex::build(&[gallery], &Classifier::default()).unwrap()
}

#[tokio::test]
async fn index_page_lists_groups_in_order() {
    let (_tmp, gallery) = fixture();
    let addr = spawn_server(build(&gallery), BrowseConfig::default()).await;

    let resp = send_raw(addr, "/").await;
    assert_eq!(resp.status, 200);
    assert!(resp.header("content-type").unwrap().starts_with("text/html"));

    let html = resp.text();
    let g = gallery.display().to_string();
    let root = html.find(&format!(">{g}<")).expect("root group");
    let bundle = html.find(&format!(">{g}/bundle.zip → sub<")).expect("archive group");
    let cat = html.find(&format!(">{g}/catA<")).expect("catA group");
    assert!(root < bundle && bundle < cat);
    assert!(html.contains("2 images"));
}

#[tokio::test]
async fn api_groups_returns_ordered_json() {
    let (_tmp, gallery) = fixture();
    let addr = spawn_server(build(&gallery), BrowseConfig::default()).await;

    let resp = send_raw(addr, "/api/groups").await;
    assert_eq!(resp.status, 200);
    let groups: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    let keys: Vec<&str> = groups
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["key"].as_str().unwrap())
        .collect();
    let g = gallery.display().to_string();
    assert_eq!(
        keys,
        vec![g.clone(), format!("{g}/bundle.zip:sub"), format!("{g}/catA")]
    );
    assert_eq!(groups[2]["images"][1]["name"], "b.png");
}

#[tokio::test]
async fn gallery_pages_through_images() {
    let (_tmp, gallery) = fixture();
    let index = build(&gallery);
    let cat_id = index
        .lookup(&format!("{}/catA", gallery.display()))
        .unwrap()
        .id
        .clone();
    let browse = BrowseConfig {
        page_size: 1,
        ..BrowseConfig::default()
    };
    let addr = spawn_server(index, browse).await;

    let first = send_raw(addr, &format!("/gallery/{cat_id}")).await;
    assert_eq!(first.status, 200);
    assert!(first.text().contains("a.png"));
    assert!(!first.text().contains("b.png"));
    assert!(first.text().contains("Page 1 of 2"));

    let second = send_raw(addr, &format!("/gallery/{cat_id}?page=2")).await;
    assert!(second.text().contains("b.png"));
    assert!(!second.text().contains("a.png"));

    // Out of range lands on the last page
    let beyond = send_raw(addr, &format!("/gallery/{cat_id}?page=40")).await;
    assert_eq!(beyond.status, 200);
    assert!(beyond.text().contains("Page 2 of 2"));
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (_tmp, gallery) = fixture();
    let addr = spawn_server(build(&gallery), BrowseConfig::default()).await;

    assert_eq!(send_raw(addr, "/gallery/ffffffffffffffff").await.status, 404);
    assert_eq!(send_raw(addr, "/image/ffffffffffffffff/x.png").await.status, 404);
    assert_eq!(send_raw(addr, "/no/such/route").await.status, 404);
}

#[tokio::test]
async fn serves_file_and_member_bytes() {
    let (_tmp, gallery) = fixture();
    let index = build(&gallery);
    let g = gallery.display().to_string();
    let a = index.lookup(&format!("{g}/catA")).unwrap().images[0].clone();
    let c = index.lookup(&format!("{g}/bundle.zip:sub")).unwrap().images[0].clone();
    let addr = spawn_server(index, BrowseConfig::default()).await;

    let file = send_raw(addr, &format!("/image/{}/a.png", a.id)).await;
    assert_eq!(file.status, 200);
    assert_eq!(file.header("content-type").as_deref(), Some("image/png"));
    assert_eq!(file.body, PNG_BYTES);

    let member = send_raw(addr, &format!("/image/{}/c.png", c.id)).await;
    assert_eq!(member.status, 200);
    assert_eq!(member.body, PNG_BYTES);
}

#[tokio::test]
async fn large_file_is_streamed_whole() {
    let (_tmp, gallery) = fixture();
    let mut big = PNG_BYTES.to_vec();
    big.extend((0..512 * 1024).map(|i| (i % 251) as u8));
    write_file(&gallery.join("catA/big.png"), &big);
    let index = build(&gallery);
    let image = index
        .lookup(&format!("{}/catA", gallery.display()))
        .unwrap()
        .images
        .iter()
        .find(|i| i.name == "big.png")
        .unwrap()
        .clone();
    let addr = spawn_server(index, BrowseConfig::default()).await;

    let resp = send_raw(addr, &format!("/image/{}/big.png", image.id)).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type").as_deref(), Some("image/png"));
    assert_eq!(resp.header("content-length"), Some(big.len().to_string()));
    assert_eq!(resp.body.len(), big.len());
    assert!(resp.body == big);
}

#[tokio::test]
async fn deleted_image_is_not_found_and_server_keeps_running() {
    let (_tmp, gallery) = fixture();
    let index = build(&gallery);
    let photo = index.lookup(&gallery.display().to_string()).unwrap().images[0].clone();
    let addr = spawn_server(index, BrowseConfig::default()).await;

    std::fs::remove_file(gallery.join("photo.jpg")).unwrap();
    let resp = send_raw(addr, &format!("/image/{}/photo.jpg", photo.id)).await;
    assert_eq!(resp.status, 404);

    assert_eq!(send_raw(addr, "/").await.status, 200);
}
