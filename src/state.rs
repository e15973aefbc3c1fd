use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db;
use crate::db::models::{BlogPost, PortfolioWork};
use crate::editor::{BlogEditor, WorkEditor};
use crate::identity::{
    IdentityProvider, PgIdentityProvider, SessionRegistry, StaticIdentityProvider, TokenKeys,
};
use crate::media::{
    CompressionOptions, ImageHost, ImageIngest, LocalObjectStorage, ObjectStorage,
    UnsignedUploadHost,
};
use crate::store::memory::MemoryCollection;
use crate::store::postgres::PgStore;
use crate::store::{Clock, Collection, IdGenerator, SystemClock};
use crate::view::{demo_works, WorkDetail};

const IMAGE_HOST_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything a handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub blogs: Arc<dyn Collection<BlogPost>>,
    pub works: Arc<dyn Collection<PortfolioWork>>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: SessionRegistry,
    pub tokens: TokenKeys,
    pub ids: Arc<IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub images: Arc<ImageIngest>,
    pub storage: Arc<dyn ObjectStorage>,
    pub fallback_works: Arc<Vec<WorkDetail>>,
    pub pool: Option<Arc<PgPool>>,
}

fn image_host(config: &AppConfig) -> Arc<dyn ImageHost> {
    let client = reqwest::Client::builder()
        .timeout(IMAGE_HOST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        });
    Arc::new(UnsignedUploadHost::new(
        client,
        config.media.upload_endpoint.clone(),
        config.media.upload_preset.clone(),
    ))
}

fn ingest(config: &AppConfig, host: Arc<dyn ImageHost>) -> Arc<ImageIngest> {
    Arc::new(ImageIngest::new(
        host,
        CompressionOptions {
            max_bytes: config.media.max_image_bytes,
            max_dimension: config.media.max_dimension,
        },
        config.media.max_upload_bytes,
    ))
}

impl AppState {
    fn assemble(
        config: AppConfig,
        blogs: Arc<dyn Collection<BlogPost>>,
        works: Arc<dyn Collection<PortfolioWork>>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        pool: Option<Arc<PgPool>>,
    ) -> Self {
        let host = image_host(&config);
        Self {
            tokens: TokenKeys::new(&config.jwt_secret),
            images: ingest(&config, host),
            storage: Arc::new(LocalObjectStorage::new(
                config.media.storage_root.clone(),
                config.media.storage_public_prefix.clone(),
            )),
            ids: Arc::new(IdGenerator::new(clock.clone())),
            sessions: SessionRegistry::new(),
            fallback_works: Arc::new(demo_works()),
            config: Arc::new(config),
            blogs,
            works,
            identity,
            clock,
            pool,
        }
    }

    /// Documents in process memory and the configured single admin account.
    pub fn in_memory(config: AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let identity = Arc::new(StaticIdentityProvider::new(
            config.admin.clone(),
            clock.clone(),
        ));
        Self::assemble(
            config,
            Arc::new(MemoryCollection::<BlogPost>::new()),
            Arc::new(MemoryCollection::<PortfolioWork>::new()),
            identity,
            clock,
            None,
        )
    }

    pub fn with_postgres(config: AppConfig, pool: Arc<PgPool>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = PgStore::new(pool.clone());
        let identity = Arc::new(PgIdentityProvider::new(pool.clone(), clock.clone()));
        Self::assemble(
            config,
            Arc::new(store.clone()),
            Arc::new(store),
            identity,
            clock,
            Some(pool),
        )
    }

    /// PostgreSQL when configured and reachable, otherwise in-memory.
    pub async fn from_config(config: AppConfig) -> Self {
        let Some(db_config) = config.database.clone() else {
            tracing::info!("DATABASE_URL not set. Running without database connection.");
            return Self::in_memory(config);
        };

        match db::init_pool(&db_config).await {
            Ok(pool) => {
                if let Err(e) = db::run_migrations(&pool).await {
                    tracing::error!("Failed to run database migrations: {}", e);
                }
                Self::with_postgres(config, pool)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize database pool: {}. Continuing without database.",
                    e
                );
                if config.is_production() && config.admin.uses_default_password {
                    tracing::error!(
                        "SECURITY: the static admin account is serving with its default password. \
                         Set ADMIN_PASSWORD_HASH."
                    );
                }
                Self::in_memory(config)
            }
        }
    }

    pub fn with_image_host(mut self, host: Arc<dyn ImageHost>) -> Self {
        self.images = ingest(&self.config, host);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn blog_editor(&self) -> BlogEditor {
        BlogEditor::new(
            self.blogs.clone(),
            self.storage.clone(),
            self.ids.clone(),
            self.clock.clone(),
            self.config.media.hosted_marker.clone(),
        )
    }

    pub fn work_editor(&self) -> WorkEditor {
        WorkEditor::new(
            self.works.clone(),
            self.storage.clone(),
            self.ids.clone(),
            self.clock.clone(),
            self.config.media.hosted_marker.clone(),
        )
    }
}
