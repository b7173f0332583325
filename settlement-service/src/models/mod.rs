pub mod account;
pub mod bill;
pub mod catalog;
pub mod dashboard;
pub mod incentive;
pub mod inventory;
pub mod membership;
pub mod wallet;

pub use account::{Account, AccountTransaction, AccountType};
pub use bill::{
    Bill, BillPatch, BillStatus, BillTotals, ClientSummary, LinePricing, NewBill, Payment,
    PaymentMethods, PaymentStatus, ProductLine, ServiceLine,
};
pub use catalog::{SalonService, Staff};
pub use dashboard::{
    BillCounts, CategorySales, Clients, DailyDashboard, Discounts, Expenses, Payments, Sales,
    StaffPerformance, TopProduct, TopService,
};
pub use incentive::{
    BillRef, DailyTargetIncentive, DashboardStatus, IncentiveDashboard, IncentiveOutcome,
    IncentiveProgram, IncentiveSummary, ProgramSnapshot, ProgramStatus, ServiceIncentive,
    StaffIncentiveSummary,
};
pub use inventory::{Inventory, InventoryTransaction, MovementKind, MovementReference};
pub use membership::{
    end_date_from, ClientMembership, DurationUnit, MembershipBenefits, MembershipDuration,
    MembershipLine, MembershipPricing, MembershipStatus, MembershipType,
};
pub use wallet::{EntryKind, TxCategory, TxReference, TxStatus, Wallet, WalletTransaction};
