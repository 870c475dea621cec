use std::collections::{HashMap, VecDeque};
use std::env;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use tramitex::auth::jwt::JwtService;
use tramitex::auth::password::hash_password;
use tramitex::config::AppConfig;
use tramitex::db::{self, PgPool};
use tramitex::mailer::Notifier;
use tramitex::models::{NewOffice, NewUser};
use tramitex::routes;
use tramitex::state::AppState;
use tramitex::storage::{ObjectStorage, StoredObject};
use tramitex::tracking::{self, CodeGenerator};
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

static DNI_SEQ: AtomicU32 = AtomicU32::new(0);

fn next_dni() -> String {
    let n = DNI_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{:08}", 10_000_000 + n)
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    deletes: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        _content_type: &str,
    ) -> Result<StoredObject> {
        let key = format!("attachments/{}-{file_name}", Uuid::new_v4());
        let url = format!("https://fake-storage/{key}");
        let mut guard = self.objects.lock().await;
        guard.insert(key.clone(), bytes);
        Ok(StoredObject { key, url })
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let mut objects = self.objects.lock().await;
        ensure!(objects.remove(key).is_some(), "object {key} missing");
        let mut deletes = self.deletes.lock().await;
        deletes.push(key.to_string());
        Ok(())
    }
}

impl FakeStorage {
    #[allow(dead_code)]
    pub async fn object_count(&self) -> usize {
        let guard = self.objects.lock().await;
        guard.len()
    }

    #[allow(dead_code)]
    pub async fn deleted_keys(&self) -> Vec<String> {
        let guard = self.deletes.lock().await;
        guard.clone()
    }
}

/// Serves scripted codes first, then falls back to the real generator.
/// Scripting the same code twice forces a unique-constraint collision.
#[derive(Default)]
pub struct FakeCodeGenerator {
    scripted: StdMutex<VecDeque<String>>,
}

impl FakeCodeGenerator {
    pub fn script(&self, codes: &[&str]) {
        let mut queue = self.scripted.lock().expect("code queue poisoned");
        queue.extend(codes.iter().map(|c| c.to_string()));
    }
}

impl CodeGenerator for FakeCodeGenerator {
    fn generate(&self) -> String {
        let mut queue = self.scripted.lock().expect("code queue poisoned");
        queue
            .pop_front()
            .unwrap_or_else(tracking::generate_tracking_code)
    }
}

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for FakeMailer {
    async fn send_tracking_code(&self, email: &str, tracking_code: &str) -> Result<()> {
        let mut guard = self.sent.lock().await;
        guard.push((email.to_string(), tracking_code.to_string()));
        Ok(())
    }
}

impl FakeMailer {
    #[allow(dead_code)]
    pub async fn sent(&self) -> Vec<(String, String)> {
        let guard = self.sent.lock().await;
        guard.clone()
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    storage: Arc<FakeStorage>,
    mailer: Arc<FakeMailer>,
    codes: Arc<FakeCodeGenerator>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            s3_bucket: "test-bucket".to_string(),
            mail_api_url: None,
            mail_api_token: None,
            mail_from: "tramites@test.local".to_string(),
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let storage = Arc::new(FakeStorage::default());
        let storage_for_state: Arc<dyn ObjectStorage> = storage.clone();
        let mailer = Arc::new(FakeMailer::default());
        let mailer_for_state: Arc<dyn Notifier> = mailer.clone();
        let codes = Arc::new(FakeCodeGenerator::default());
        let codes_for_state: Arc<dyn CodeGenerator> = codes.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(
            pool.clone(),
            config,
            storage_for_state,
            mailer_for_state,
            codes_for_state,
            jwt,
        );
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            storage,
            mailer,
            codes,
        })
    }

    #[allow(dead_code)]
    pub fn codes(&self) -> Arc<FakeCodeGenerator> {
        self.codes.clone()
    }

    #[allow(dead_code)]
    pub fn storage(&self) -> Arc<FakeStorage> {
        self.storage.clone()
    }

    #[allow(dead_code)]
    pub fn mailer(&self) -> Arc<FakeMailer> {
        self.mailer.clone()
    }

    #[allow(dead_code)]
    pub async fn insert_office(&self, name: &str, parent: Option<Uuid>) -> Result<Uuid> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let office = NewOffice {
                id: Uuid::new_v4(),
                name,
                acronym: "TST".to_string(),
                office_type: "unidad".to_string(),
                parent_office_id: parent,
            };
            diesel::insert_into(tramitex::schema::offices::table)
                .values(&office)
                .execute(conn)
                .context("failed to insert office")?;
            Ok(office.id)
        })
        .await
    }

    pub async fn insert_user(
        &self,
        username: &str,
        password: &str,
        role: &str,
        office_id: Option<Uuid>,
    ) -> Result<Uuid> {
        let username = username.to_string();
        let password = password.to_string();
        let role = role.to_string();
        self.with_conn(move |conn| {
            let password_hash = hash_password(&password)?;
            let user = NewUser {
                id: Uuid::new_v4(),
                email: format!("{username}@test.local"),
                dni: next_dni(),
                name: "Test".to_string(),
                last_name: "User".to_string(),
                username,
                password_hash,
                role,
                office_id,
            };
            diesel::insert_into(tramitex::schema::users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    pub async fn login_token(&self, username: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            username: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/api/auth/login",
                &LoginPayload { username, password },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// Multipart registration form: one file part plus the applicant fields.
    #[allow(dead_code)]
    pub async fn register_document(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        file_name: &str,
        file_bytes: &[u8],
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();

        for (name, value) in fields {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend(value.as_bytes());
            body.extend(b"\r\n");
        }

        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend(b"Content-Type: application/pdf\r\n\r\n");
        body.extend(file_bytes);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            );
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE document_history, document_attachments, documents, users, offices RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}

/// Standard applicant form used by the flow tests.
#[allow(dead_code)]
pub fn applicant_fields<'a>() -> Vec<(&'a str, &'a str)> {
    vec![
        ("applicant_type", "natural"),
        ("applicant_identifier", "45678912"),
        ("applicant_name", "Ana"),
        ("applicant_lastname", "Quispe"),
        ("applicant_email", "ana@x.pe"),
        ("document_type", "solicitud"),
        ("subject", "Solicitud de licencia de funcionamiento"),
        ("page_count", "3"),
    ]
}
