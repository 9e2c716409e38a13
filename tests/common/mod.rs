#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image_gallery::AppState;
use image_gallery::config::AppConfig;
use image_gallery::infrastructure::database;
use image_gallery::services::image_service::ImageService;
use image_gallery::services::labels::LabelDetector;
use image_gallery::services::storage::{ObjectSummary, StorageService, build_public_url};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const PUBLIC_BASE: &str = "http://mock-bucket.local";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    pub tags: Vec<String>,
}

/// Blocks `upload_file` for one key until released
pub struct UploadGate {
    pub key_part: String,
    pub started: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct MockStorageService {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_put: Mutex<Vec<String>>,
    pub fail_exists: Mutex<Vec<String>>,
    pub fail_get_tags: Mutex<Vec<String>>,
    pub fail_tag_put: Mutex<bool>,
    pub fail_list: Mutex<bool>,
    pub fail_delete: Mutex<Vec<String>>,
    pub gate: Mutex<Option<Arc<UploadGate>>>,
    pub puts: AtomicUsize,
    pub tag_puts: AtomicUsize,
    pub temp_puts: AtomicUsize,
    pub temp_deletes: AtomicUsize,
}

fn matches_any(list: &Mutex<Vec<String>>, key: &str) -> bool {
    list.lock().unwrap().iter().any(|part| key.contains(part))
}

impl MockStorageService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Put an object directly, bypassing the counters
    pub fn seed(&self, key: &str, data: &[u8], tags: &[&str]) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: Bytes::copy_from_slice(data),
                content_type: "image/png".to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn fail_put_for(&self, key_part: &str) {
        self.fail_put.lock().unwrap().push(key_part.to_string());
    }

    pub fn fail_exists_for(&self, key_part: &str) {
        self.fail_exists.lock().unwrap().push(key_part.to_string());
    }

    pub fn fail_get_tags_for(&self, key_part: &str) {
        self.fail_get_tags.lock().unwrap().push(key_part.to_string());
    }

    pub fn fail_tagging(&self) {
        *self.fail_tag_put.lock().unwrap() = true;
    }

    pub fn fail_delete_for(&self, key_part: &str) {
        self.fail_delete.lock().unwrap().push(key_part.to_string());
    }

    pub fn fail_listing(&self) {
        *self.fail_list.lock().unwrap() = true;
    }

    pub fn gate_uploads_of(&self, key_part: &str) -> Arc<UploadGate> {
        let gate = Arc::new(UploadGate {
            key_part: key_part.to_string(),
            started: Notify::new(),
            release: Notify::new(),
        });
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn upload_file(&self, key: &str, data: Bytes, content_type: &str) -> anyhow::Result<()> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate.filter(|g| key.contains(&g.key_part)) {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        if matches_any(&self.fail_put, key) {
            return Err(anyhow::anyhow!("PutObject failed for {}", key));
        }
        if key.starts_with("tmp/") {
            self.temp_puts.fetch_add(1, Ordering::SeqCst);
        } else {
            self.puts.fetch_add(1, Ordering::SeqCst);
        }

        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                tags: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> anyhow::Result<()> {
        if matches_any(&self.fail_delete, key) {
            return Err(anyhow::anyhow!("DeleteObject: AccessDenied for {}", key));
        }
        if key.starts_with("tmp/") {
            self.temp_deletes.fetch_add(1, Ordering::SeqCst);
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        if matches_any(&self.fail_exists, key) {
            return Err(anyhow::anyhow!("HeadObject failed for {}", key));
        }
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Vec<ObjectSummary>> {
        if *self.fail_list.lock().unwrap() {
            return Err(anyhow::anyhow!("ListObjectsV2: AccessDenied"));
        }
        let objects = self.objects.lock().unwrap();
        let mut listed: Vec<ObjectSummary> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectSummary {
                key: key.clone(),
                size: obj.data.len() as i64,
            })
            .collect();
        listed.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listed)
    }

    async fn get_object_tags(&self, key: &str) -> anyhow::Result<Vec<String>> {
        if matches_any(&self.fail_get_tags, key) {
            return Err(anyhow::anyhow!("GetObjectTagging failed for {}", key));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|o| o.tags.clone())
            .ok_or_else(|| anyhow::anyhow!("NoSuchKey: {}", key))
    }

    async fn put_object_tags(&self, key: &str, tags: &[String]) -> anyhow::Result<()> {
        self.tag_puts.fetch_add(1, Ordering::SeqCst);
        if *self.fail_tag_put.lock().unwrap() {
            return Err(anyhow::anyhow!("PutObjectTagging failed for {}", key));
        }
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .get_mut(key)
            .ok_or_else(|| anyhow::anyhow!("NoSuchKey: {}", key))?;
        object.tags = tags.to_vec();
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        build_public_url(PUBLIC_BASE, key)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Returns fixed labels, or fails every call
pub struct MockLabelDetector {
    pub labels: Vec<String>,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub seen_keys: Mutex<Vec<String>>,
}

impl MockLabelDetector {
    pub fn with_labels(labels: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
            seen_keys: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            labels: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            seen_keys: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LabelDetector for MockLabelDetector {
    async fn detect_labels(&self, key: &str) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_keys.lock().unwrap().push(key.to_string());
        if self.fail {
            return Err(anyhow::anyhow!("DetectLabels: InvalidImageFormatException"));
        }
        Ok(self.labels.clone())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("image_gallery=debug,tower_http=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Development config with auto-tagging switched on or off
pub fn test_config(auto_tagging: bool) -> AppConfig {
    AppConfig {
        auto_tagging,
        jwt_secret: "test-secret".to_string(),
        ..AppConfig::development()
    }
}

pub fn test_service(
    config: AppConfig,
    storage: Arc<MockStorageService>,
    labels: Arc<MockLabelDetector>,
) -> ImageService {
    ImageService::new(storage, labels, Arc::new(config))
}

pub async fn test_state(
    config: AppConfig,
    storage: Arc<MockStorageService>,
    labels: Arc<MockLabelDetector>,
) -> AppState {
    init_tracing();
    let db = database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();

    let config = Arc::new(config);
    let image_service = Arc::new(ImageService::new(
        storage.clone(),
        labels,
        config.clone(),
    ));

    AppState {
        db,
        storage,
        image_service,
        config,
        shutdown: CancellationToken::new(),
    }
}

/// A small valid PNG
pub fn png_bytes() -> Bytes {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

pub fn png(name: &str) -> image_gallery::services::image_service::IncomingImage {
    image_gallery::services::image_service::IncomingImage {
        filename: name.to_string(),
        content_type: Some("image/png".to_string()),
        data: png_bytes(),
    }
}
