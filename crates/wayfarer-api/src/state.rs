use crate::audit::AuditTrail;
use crate::auth::IdentityProvider;
use crate::services::{
    AuditLogService, ConversionService, EnquiryService, InfluencerService, LeadService,
    LegalService, PayoutService, TeamService,
};
use sqlx::PgPool;
use std::sync::Arc;
use wayfarer_core::{Config, RbacPolicy};
use wayfarer_db::{
    AdminRoleRepository, AdminRoleStore, AuditLogRepository, AuditLogStore, EnquiryRepository,
    EnquiryStore, InfluencerRepository, LeadRepository, LeadStore, LegalDocumentRepository,
    LegalDocumentStore, PayoutRepository, PayoutStore, ReferralStore,
};
use wayfarer_storage::Storage;

/// Persistence handles, one per store trait.
#[derive(Clone)]
pub struct Stores {
    pub leads: Arc<dyn LeadStore>,
    pub enquiries: Arc<dyn EnquiryStore>,
    pub referrals: Arc<dyn ReferralStore>,
    pub payouts: Arc<dyn PayoutStore>,
    pub audit_logs: Arc<dyn AuditLogStore>,
    pub roles: Arc<dyn AdminRoleStore>,
    pub legal: Arc<dyn LegalDocumentStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            leads: Arc::new(LeadRepository::new(pool.clone())),
            enquiries: Arc::new(EnquiryRepository::new(pool.clone())),
            referrals: Arc::new(InfluencerRepository::new(pool.clone())),
            payouts: Arc::new(PayoutRepository::new(pool.clone())),
            audit_logs: Arc::new(AuditLogRepository::new(pool.clone())),
            roles: Arc::new(AdminRoleRepository::new(pool.clone())),
            legal: Arc::new(LegalDocumentRepository::new(pool)),
        }
    }

    /// Every store backed by one object, as the in-memory store used in tests is.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: LeadStore
            + EnquiryStore
            + ReferralStore
            + PayoutStore
            + AuditLogStore
            + AdminRoleStore
            + LegalDocumentStore
            + 'static,
    {
        Self {
            leads: store.clone(),
            enquiries: store.clone(),
            referrals: store.clone(),
            payouts: store.clone(),
            audit_logs: store.clone(),
            roles: store.clone(),
            legal: store,
        }
    }
}

/// HTTP-facing settings lifted out of [`Config`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub session_cookie_name: String,
    pub max_upload_bytes: usize,
    pub production: bool,
    pub default_currency: String,
    pub http_concurrency_limit: usize,
}

impl HttpSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_cookie_name: config.session_cookie_name().to_string(),
            max_upload_bytes: config.max_upload_bytes(),
            production: config.is_production(),
            default_currency: config.default_currency().to_string(),
            http_concurrency_limit: config.http_concurrency_limit(),
        }
    }
}

#[derive(Clone)]
pub struct DomainServices {
    pub leads: LeadService,
    pub conversion: ConversionService,
    pub enquiries: EnquiryService,
    pub influencers: InfluencerService,
    pub payouts: PayoutService,
    pub team: TeamService,
    pub legal: LegalService,
    pub audit_logs: AuditLogService,
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: DomainServices,
    pub audit: AuditTrail,
    pub roles: Arc<dyn AdminRoleStore>,
    pub policy: Arc<RbacPolicy>,
    pub identity: Arc<dyn IdentityProvider>,
    pub settings: HttpSettings,
}

impl AppState {
    pub fn new(
        stores: Stores,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn Storage>,
        settings: HttpSettings,
    ) -> Self {
        let services = DomainServices {
            leads: LeadService::new(stores.leads.clone(), stores.referrals.clone()),
            conversion: ConversionService::new(
                stores.leads.clone(),
                stores.referrals.clone(),
                settings.default_currency.clone(),
            ),
            enquiries: EnquiryService::new(stores.enquiries.clone(), stores.referrals.clone()),
            influencers: InfluencerService::new(stores.referrals.clone()),
            payouts: PayoutService::new(stores.payouts.clone(), stores.referrals.clone()),
            team: TeamService::new(stores.roles.clone()),
            legal: LegalService::new(stores.legal.clone(), storage),
            audit_logs: AuditLogService::new(stores.audit_logs.clone()),
        };

        Self {
            services,
            audit: AuditTrail::new(stores.audit_logs),
            roles: stores.roles,
            policy: Arc::new(RbacPolicy::standard()),
            identity,
            settings,
        }
    }
}
