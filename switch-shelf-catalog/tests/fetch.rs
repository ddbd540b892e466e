use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use switch_shelf_catalog::fetch::{build_client, fetch_document};
use switch_shelf_catalog::{CatalogError, CatalogSources, FetchSource, RemoteCatalogLoader};
use switch_shelf_core::{SilentProgress, TitleId};

const ETAG: &str = "\"abc123\"";

/// Serve `count` connections; requests carrying the current ETag get a 304.
fn serve(count: usize, body: &'static str) -> String {
    serve_bodies(vec![body; count])
}

/// Serve one connection per body, in order, without ETags.
fn serve_bodies(bodies: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for (stream, body) in listener.incoming().zip(bodies) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut conditional = false;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if lower.starts_with("if-none-match:") && line.contains(ETAG) {
                    conditional = true;
                }
            }
            let response = if conditional {
                "HTTP/1.1 304 Not Modified\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
                    .to_string()
            } else {
                format!(
                    "HTTP/1.1 200 OK\r\nConnection: close\r\nETag: {ETAG}\r\nContent-Length: {}\r\n\r\n{body}",
                    body.len()
                )
            };
            stream.write_all(response.as_bytes()).unwrap();
        }
    });
    format!("http://{addr}")
}

#[test]
fn test_download_then_not_modified() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("titles.json");
    let url = serve(2, "{}");
    let client = build_client(Duration::from_secs(5)).unwrap();

    let first = fetch_document(&client, &url, &dest, None).unwrap();
    assert_eq!(first.source, FetchSource::Downloaded);
    assert_eq!(first.etag.as_deref(), Some(ETAG));
    assert!(!dest.exists());
    first.commit(&dest).unwrap();
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "{}");

    let second = fetch_document(&client, &url, &dest, first.etag.as_deref()).unwrap();
    assert_eq!(second.source, FetchSource::NotModified);
    assert_eq!(second.etag.as_deref(), Some(ETAG));
}

#[test]
fn test_etag_ignored_without_local_copy() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("versions.json");
    let url = serve(1, "{}");
    let client = build_client(Duration::from_secs(5)).unwrap();

    let outcome = fetch_document(&client, &url, &dest, Some(ETAG)).unwrap();
    assert_eq!(outcome.source, FetchSource::Downloaded);
    assert!(outcome.path.is_file());
    outcome.discard();
    assert!(!outcome.path.exists());
    assert!(!dest.exists());
}

#[test]
fn test_unreachable_server() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("titles.json");
    let client = build_client(Duration::from_secs(5)).unwrap();

    let err = fetch_document(&client, "http://127.0.0.1:1/titles.json", &dest, None).unwrap_err();
    assert!(matches!(err, CatalogError::CatalogUnavailable { .. }));
    assert!(err.is_retryable());

    std::fs::write(&dest, "{}").unwrap();
    let outcome =
        fetch_document(&client, "http://127.0.0.1:1/titles.json", &dest, Some(ETAG)).unwrap();
    assert_eq!(outcome.source, FetchSource::DiskFallback);
    assert_eq!(outcome.etag.as_deref(), Some(ETAG));
}

#[test]
fn test_loader_refresh() {
    let tmp = tempfile::tempdir().unwrap();
    let titles = serve(1, r#"{"1": {"id": "0100AAAA00000000", "name": "Alpha"}}"#);
    let versions = serve(1, r#"{"0100aaaa00000000": {"65536": "2020-01-01"}}"#);
    let sources = CatalogSources {
        titles_url: titles,
        versions_url: versions,
        ..Default::default()
    };

    let mut loader = RemoteCatalogLoader::new(tmp.path()).with_timeout(Duration::from_secs(5));
    let outcome = loader.refresh(&sources, &SilentProgress).unwrap();
    assert_eq!(outcome.title_count, 1);
    assert!(!outcome.offline);
    assert_eq!(outcome.titles_etag.as_deref(), Some(ETAG));

    let entry = loader
        .catalog()
        .and_then(|c| c.get(TitleId::new(0x0100_AAAA_0000_0000)))
        .unwrap();
    assert_eq!(entry.latest_update().map(|(v, _)| v), Some(65536));

    // Server gone: the local copies keep the catalog usable
    let offline = CatalogSources {
        titles_url: "http://127.0.0.1:1/t".into(),
        versions_url: "http://127.0.0.1:1/v".into(),
        ..Default::default()
    };
    let outcome = loader.refresh(&offline, &SilentProgress).unwrap();
    assert!(outcome.offline);
    assert_eq!(outcome.title_count, 1);
}

#[test]
fn test_malformed_download_keeps_disk_copy() {
    let tmp = tempfile::tempdir().unwrap();
    let titles = serve_bodies(vec![
        r#"{"1": {"id": "0100AAAA00000000", "name": "Alpha"}}"#,
        "garbage",
    ]);
    let versions = serve_bodies(vec!["{}", "{}"]);
    let sources = CatalogSources {
        titles_url: titles,
        versions_url: versions,
        ..Default::default()
    };

    let mut loader = RemoteCatalogLoader::new(tmp.path()).with_timeout(Duration::from_secs(5));
    assert_eq!(loader.refresh(&sources, &SilentProgress).unwrap().title_count, 1);

    let err = loader.refresh(&sources, &SilentProgress).unwrap_err();
    assert!(matches!(err, CatalogError::CatalogMalformed(_)));
    assert_eq!(loader.catalog().map(|c| c.len()), Some(1));

    // A restarted loader still finds the last good documents
    let mut restarted = RemoteCatalogLoader::new(tmp.path());
    assert_eq!(restarted.load_local().unwrap(), 1);
    let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|n| n.to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());
}
