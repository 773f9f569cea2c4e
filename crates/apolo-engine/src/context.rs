//! Collaborators shared by every handler

use apolo_cache::Guardian;
use apolo_core::config::{AppConfig, GeneralConfig, MailerConfig};
use apolo_core::traits::{CacheReloader, CdrStorage, DataStore, EventPublisher};
use apolo_core::AppResult;
use std::sync::Arc;

use crate::mailer::{MailSender, SmtpMailer};
use crate::poster::HttpPoster;
use crate::publisher::BroadcastPublisher;
use crate::rpc::RpcMethodRegistry;

/// Default capacity of the in-process event bus
const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EngineContext {
    pub data_store: Arc<dyn DataStore>,
    pub cache: Arc<dyn CacheReloader>,
    /// CDRs from `*cdrlog` are only persisted when storage is configured
    pub cdr_storage: Option<Arc<dyn CdrStorage>>,
    pub guardian: Guardian,
    pub publisher: Arc<dyn EventPublisher>,
    pub poster: HttpPoster,
    pub mailer: Arc<dyn MailSender>,
    pub rpc_methods: Arc<RpcMethodRegistry>,
    pub general: GeneralConfig,
    pub mailer_config: MailerConfig,
}

impl EngineContext {
    pub fn new(
        config: &AppConfig,
        data_store: Arc<dyn DataStore>,
        cache: Arc<dyn CacheReloader>,
        guardian: Guardian,
    ) -> AppResult<Self> {
        let poster = HttpPoster::new(
            config.general.http_skip_tls_verify,
            config.general.reply_timeout(),
        )?;
        Ok(Self {
            data_store,
            cache,
            cdr_storage: None,
            guardian,
            publisher: Arc::new(BroadcastPublisher::new(EVENT_BUS_CAPACITY)),
            poster,
            mailer: Arc::new(SmtpMailer::new(&config.mailer)),
            rpc_methods: Arc::new(RpcMethodRegistry::with_defaults()),
            general: config.general.clone(),
            mailer_config: config.mailer.clone(),
        })
    }

    pub fn with_cdr_storage(mut self, storage: Arc<dyn CdrStorage>) -> Self {
        self.cdr_storage = Some(storage);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn MailSender>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_poster(mut self, poster: HttpPoster) -> Self {
        self.poster = poster;
        self
    }

    pub fn with_rpc_methods(mut self, methods: RpcMethodRegistry) -> Self {
        self.rpc_methods = Arc::new(methods);
        self
    }
}
