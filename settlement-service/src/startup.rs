//! Application wiring: store connection, repositories, services, indexes.

use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::observability;

use crate::config::SettlementConfig;
use crate::services::{
    metrics, BillRepository, CatalogRepository, DashboardService, DirectoryService,
    IncentiveService, InventoryService, LedgerService, MembershipService, SettlementService,
};

/// Built service graph, ready to be embedded by a transport layer.
pub struct Application {
    db: mongodb::Database,
    config: SettlementConfig,
    settlement: SettlementService,
    incentives: IncentiveService,
    dashboards: DashboardService,
    ledger: LedgerService,
}

impl Application {
    pub async fn build(config: SettlementConfig) -> anyhow::Result<Self> {
        match &config.otlp_endpoint {
            Some(endpoint) => observability::init_tracing_with_otlp(
                &config.service_name,
                &config.log_level,
                endpoint,
            ),
            None => observability::init_tracing(&config.service_name, &config.log_level),
        }

        let mut client_options =
            ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        metrics::init_metrics();

        let bills = BillRepository::new(&db);
        let catalog = CatalogRepository::new(&db);
        let directory = DirectoryService::new(&db);
        let ledger = LedgerService::new(&db);
        let inventory = InventoryService::new(&db, catalog.clone());
        let memberships = MembershipService::new(&db, ledger.clone());
        let dashboards = DashboardService::new(
            &db,
            config.business.timezone_offset_minutes,
            config.business.new_client_window_hours,
        );
        let incentives = IncentiveService::new(
            &db,
            bills.clone(),
            directory.clone(),
            ledger.clone(),
            config.business.timezone_offset_minutes,
        );

        bills.init_indexes().await?;
        ledger.init_indexes().await?;
        inventory.init_indexes().await?;
        memberships.init_indexes().await?;
        dashboards.init_indexes().await?;
        incentives.init_indexes().await?;

        let settlement = SettlementService::new(
            bills,
            ledger.clone(),
            inventory,
            memberships,
            dashboards.clone(),
            directory,
        );

        tracing::info!(
            db_name = %config.database.db_name,
            tz_offset_minutes = config.business.timezone_offset_minutes,
            "settlement service built"
        );

        Ok(Self {
            db,
            config,
            settlement,
            incentives,
            dashboards,
            ledger,
        })
    }

    pub fn settlement(&self) -> &SettlementService {
        &self.settlement
    }

    pub fn incentives(&self) -> &IncentiveService {
        &self.incentives
    }

    pub fn dashboards(&self) -> &DashboardService {
        &self.dashboards
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }
}
