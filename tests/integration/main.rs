//! Integration tests for scancache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Command isolated from the user's real config file
    fn scancache(config_dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("scancache");
        cmd.env("SCANCACHE_CONFIG", config_dir.path().join("config.toml"))
            .env_remove("RUST_LOG");
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        scancache(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("config"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        scancache(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("scancache"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        scancache(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let dir = TempDir::new().unwrap();
        scancache(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[server]"))
            .stdout(predicate::str::contains("redis://127.0.0.1:6379"));
    }

    #[test]
    fn config_init_then_show() {
        let dir = TempDir::new().unwrap();
        scancache(&dir).args(["config", "init"]).assert().success();
        assert!(dir.path().join("config.toml").exists());

        scancache(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dedupe_concurrent_scans = true"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[server\nport = ").unwrap();

        scancache(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn unknown_subcommand_fails() {
        let dir = TempDir::new().unwrap();
        scancache(&dir).arg("frobnicate").assert().failure();
    }
}

mod http_tests {
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use scancache::cache::{CacheStore, MemoryStore};
    use scancache::docker::{ImageCatalog, ImageSummary};
    use scancache::pipeline::{PipelineOptions, Pipelines};
    use scancache::scanner::{ScanReport, Scanner, ScannerInvoker, SeverityCounts};
    use scancache::server::{router, AppState};
    use scancache::{ScanCacheError, ScanCacheResult};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeScanner {
        scans: AtomicUsize,
        db_updates: AtomicUsize,
        broken: AtomicBool,
    }

    #[async_trait]
    impl Scanner for FakeScanner {
        async fn scan(&self, image: &str) -> ScanCacheResult<ScanReport> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            if self.broken.load(Ordering::SeqCst) {
                return Err(ScanCacheError::ScanExecution {
                    image: image.to_string(),
                    reason: "exit code 1: unable to pull image".to_string(),
                });
            }
            Ok(ScanReport {
                severity_counts: SeverityCounts::from_counts([
                    ("Low", 19),
                    ("Medium", 11),
                    ("Negligible", 3),
                ]),
                full_report: json!({ "matches": [], "source": { "target": image } }),
            })
        }

        async fn update_database(&self) -> ScanCacheResult<()> {
            self.db_updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn scanner_name(&self) -> &'static str {
            "fake"
        }
    }

    struct FakeCatalog;

    #[async_trait]
    impl ImageCatalog for FakeCatalog {
        async fn list_images(&self) -> ScanCacheResult<Vec<ImageSummary>> {
            Ok(vec![ImageSummary {
                id: "4f2a1c9e8b7d".to_string(),
                repository: "myapp".to_string(),
                tag: "latest".to_string(),
                created_since: "3 hours ago".to_string(),
                size: "87.2MB".to_string(),
                name: "myapp:latest".to_string(),
            }])
        }
    }

    struct Harness {
        app: Router,
        scanner: Arc<FakeScanner>,
        store: Arc<MemoryStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let scanner = Arc::new(FakeScanner::default());
        let pipelines = Pipelines::build(
            store.clone(),
            ScannerInvoker::new(scanner.clone()),
            Arc::new(FakeCatalog),
            &PipelineOptions::default(),
        );
        let app = router(Arc::new(AppState::new(pipelines, store.backend_name())));
        Harness {
            app,
            scanner,
            store,
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn post_scan(app: &Router, route: &str, scan_name: &str) -> (StatusCode, Value) {
        let body = json!({ "scanName": scan_name }).to_string();
        send(app, Method::POST, route, Some(&body)).await
    }

    #[tokio::test]
    async fn scan_then_cached_scan() {
        let h = harness();

        let (status, first) = post_scan(&h.app, "/images/scan", "myapp:latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["vulnerabilities"]["Low"], 19);
        assert_eq!(first["vulnerabilities"]["Medium"], 11);
        assert_eq!(first["vulnerabilities"]["Negligible"], 3);
        assert_eq!(first["vulnerabilities"]["Critical"], 0);
        assert_eq!(first["everything"]["source"]["target"], "myapp:latest");
        assert!(first["timestamp"].is_string());

        let (status, second) = post_scan(&h.app, "/images/scan", "myapp:latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second, first);
        assert_eq!(h.scanner.scans.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rescan_always_runs_scanner() {
        let h = harness();

        post_scan(&h.app, "/images/scan", "myapp:latest").await;
        let (status, body) = post_scan(&h.app, "/images/rescan", "myapp:latest").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vulnerabilities"]["Low"], 19);
        assert_eq!(h.scanner.scans.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_scan_name_is_bad_request() {
        let h = harness();

        let (status, body) = post_scan(&h.app, "/images/scan", "  ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("scanName"));

        let (status, _) = send(&h.app, Method::POST, "/images/scan", Some("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&h.app, Method::POST, "/images/rescan", Some("not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(h.scanner.scans.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scanner_failure_is_generic_500() {
        let h = harness();
        h.scanner.broken.store(true, Ordering::SeqCst);

        let (status, body) = post_scan(&h.app, "/images/scan", "myapp:latest").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "message": "internal server error" }));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn corrupt_report_still_served() {
        let h = harness();
        post_scan(&h.app, "/images/scan", "myapp:latest").await;
        h.store
            .set("myapp:latest&everything", "{\"matches\": [")
            .await
            .unwrap();

        let (status, body) = post_scan(&h.app, "/images/scan", "myapp:latest").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vulnerabilities"]["Low"], 19);
        assert!(body["everything"].is_null());
        assert_eq!(h.scanner.scans.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn list_images_updates_database_once() {
        let h = harness();

        let (status, body) = send(&h.app, Method::GET, "/images", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "myapp:latest");
        assert_eq!(body[0]["createdSince"], "3 hours ago");

        send(&h.app, Method::GET, "/images", None).await;
        assert_eq!(h.scanner.db_updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evict_forces_rescan() {
        let h = harness();
        post_scan(&h.app, "/images/scan", "library/nginx:1.27").await;

        let (status, _) = send(&h.app, Method::DELETE, "/images/cache/library/nginx:1.27", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(h.store.is_empty());

        post_scan(&h.app, "/images/scan", "library/nginx:1.27").await;
        assert_eq!(h.scanner.scans.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn health_names_backend() {
        let h = harness();

        let (status, body) = send(&h.app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "cache": "memory" }));
    }
}
