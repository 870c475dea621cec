use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
    mailer::Notifier,
    storage::ObjectStorage,
    tracking::CodeGenerator,
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Shared handles cloned into every handler: the connection pool plus the
/// storage, mail and token collaborators behind their trait seams.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub mailer: Arc<dyn Notifier>,
    pub codes: Arc<dyn CodeGenerator>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        mailer: Arc<dyn Notifier>,
        codes: Arc<dyn CodeGenerator>,
        jwt: JwtService,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            storage,
            mailer,
            codes,
            jwt,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("no se pudo obtener conexión: {err}")))
    }
}
