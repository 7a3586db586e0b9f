use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use axum::{async_trait, Router};
use axum_test::{
    multipart::{MultipartForm, Part},
    TestServer,
};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};

use crate::{
    clock::Clock,
    config::{Config, DatabaseConfig, GeneralConfig, InstrumentationConfig, StorageConfig},
    models::File,
    repository::{FileRepository, InsertFile},
    router,
    storage::{ObjectStore, StoreError},
    AppContext,
};

pub const TEST_BUCKET: &str = "test-bucket";

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct MemoryObjects {
    objects: Mutex<HashMap<String, Bytes>>,
    pub fail: AtomicBool,
}

impl MemoryObjects {
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn get_by_url(&self, url: &str) -> Option<Bytes> {
        let objects = self.objects.lock().unwrap();
        objects
            .iter()
            .find(|(key, _)| self.url(key) == url)
            .map(|(_, data)| data.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<String, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                status: 503,
            });
        }

        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(self.url(key))
    }

    fn url(&self, key: &str) -> String {
        format!("https://{TEST_BUCKET}.s3.test/{key}")
    }
}

pub struct MemoryFiles {
    clock: Arc<dyn Clock>,
    rows: Mutex<Vec<File>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryFiles {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rows: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn rows(&self) -> Vec<File> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileRepository for MemoryFiles {
    async fn insert_file(&self, insert: InsertFile) -> sqlx::Result<File> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolClosed);
        }

        let created_at = self.clock.now();
        let mut rows = self.rows.lock().unwrap();
        let file = File {
            id: rows.len() as i64 + 1,
            filename: insert.filename,
            file_url: insert.file_url,
            expiry_date: created_at + insert.ttl,
            created_at,
        };
        rows.push(file.clone());
        Ok(file)
    }

    async fn fetch_file(&self, id: i64) -> sqlx::Result<Option<File>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }

        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|file| file.id == id).cloned())
    }

    async fn fetch_files(&self) -> sqlx::Result<Vec<File>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }

        Ok(self.rows())
    }
}

pub fn test_config() -> Config {
    Config {
        general: GeneralConfig {
            address: "127.0.0.1".into(),
            port: 0,
            cors_origin: None,
            max_upload_bytes: 10 * 1024 * 1024,
            expiry_hours: 24,
        },
        database: DatabaseConfig {
            url: "postgres://unused".into(),
            max_connections: 1,
        },
        storage: StorageConfig {
            bucket: TEST_BUCKET.into(),
            region: "us-east-1".into(),
            key_prefix: "files".into(),
            public_domain: "s3.test".into(),
            endpoint: None,
            public_url: None,
            access_key_id: None,
            secret_access_key: None,
        },
        instrumentation: InstrumentationConfig { directives: vec![] },
    }
}

pub struct TestApp {
    pub ctx: AppContext,
    pub clock: Arc<ManualClock>,
    pub files: Arc<MemoryFiles>,
    pub objects: Arc<MemoryObjects>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(cfg: Config) -> Self {
        let clock = Arc::new(ManualClock::new());
        let files = Arc::new(MemoryFiles::new(clock.clone()));
        let objects = Arc::new(MemoryObjects::default());

        let ctx = AppContext {
            cfg: Arc::new(cfg),
            files: files.clone(),
            objects: objects.clone(),
            clock: clock.clone(),
        };

        Self {
            ctx,
            clock,
            files,
            objects,
        }
    }

    pub fn router(&self) -> anyhow::Result<Router> {
        Ok(router(self.ctx.clone())?)
    }

    pub fn server(&self) -> anyhow::Result<TestServer> {
        TestServer::new(self.router()?)
    }

    /// Insert a row directly, bypassing the upload endpoint.
    pub async fn seed(&self, filename: &str, file_url: &str) -> anyhow::Result<File> {
        let file = self
            .files
            .insert_file(InsertFile {
                filename: filename.to_string(),
                file_url: file_url.to_string(),
                ttl: Duration::hours(24),
            })
            .await?;
        Ok(file)
    }
}

pub fn upload_form(data: &'static [u8], file_name: &str) -> MultipartForm {
    MultipartForm::new().add_part("file", Part::bytes(data).file_name(file_name))
}

/// Pull `(download link, file id)` out of an upload response body.
pub fn parse_upload_response(body: &str) -> (String, i64) {
    let mut url = None;
    let mut id = None;

    for line in body.lines() {
        if let Some(rest) = line.strip_prefix("File uploaded successfully. Download link: ") {
            url = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("File ID: ") {
            id = rest.parse().ok();
        }
    }

    (
        url.expect("upload response should carry a download link"),
        id.expect("upload response should carry a file id"),
    )
}
