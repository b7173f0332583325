pub mod dashboard;
pub mod incentives;
pub mod inventory;
pub mod ledger;
pub mod memberships;
pub mod metrics;
pub mod repository;
pub mod settlement;

pub use dashboard::{fold_bill, DashboardService};
pub use incentives::{
    build_staff_summaries, business_day_bounds, compute_incentives, date_number, IncentiveService,
    WORKING_DAYS_PER_MONTH,
};
pub use inventory::{InventoryAdjustment, InventoryService};
pub use ledger::{AccountEntryContext, LedgerService};
pub use memberships::{MembershipService, ProvisionResult};
pub use repository::{BillRepository, CatalogRepository, Counter, DirectoryService};
pub use settlement::{
    EffectPlan, SettlementReport, SettlementService, SettlementStep, StepOutcome, StepStatus,
};
