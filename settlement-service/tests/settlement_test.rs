use settlement_service::models::BillStatus;
use settlement_service::services::EffectPlan;

#[test]
fn creating_a_completed_bill_fires_everything() {
    let plan = EffectPlan::for_create(BillStatus::Completed);
    assert!(plan.memberships);
    assert!(plan.wallet_debit);
    assert!(plan.incentives);
    assert!(plan.inventory);
    assert!(plan.dashboard_fold);
}

#[test]
fn creating_a_pending_bill_defers_completion_effects() {
    let plan = EffectPlan::for_create(BillStatus::Pending);
    assert!(plan.memberships);
    assert!(plan.wallet_debit);
    assert!(!plan.incentives);
    assert!(!plan.inventory);
    assert!(!plan.dashboard_fold);
}

#[test]
fn completing_a_pending_bill_fires_deferred_effects_once() {
    let plan = EffectPlan::for_update(BillStatus::Pending, BillStatus::Completed);
    assert!(plan.incentives);
    assert!(plan.inventory);
    assert!(plan.dashboard_fold);
}

#[test]
fn resaving_a_completed_bill_does_not_rerun_inventory_or_incentives() {
    let plan = EffectPlan::for_update(BillStatus::Completed, BillStatus::Completed);
    assert!(!plan.incentives);
    assert!(!plan.inventory);
    // The dashboard re-fold for an already-completed bill is intentional.
    assert!(plan.dashboard_fold);
}

#[test]
fn updating_a_bill_that_stays_pending_keeps_completion_effects_deferred() {
    let plan = EffectPlan::for_update(BillStatus::Pending, BillStatus::Pending);
    assert!(plan.memberships);
    assert!(plan.wallet_debit);
    assert!(!plan.incentives);
    assert!(!plan.inventory);
    assert!(!plan.dashboard_fold);
}

#[test]
fn terminal_transitions_fire_nothing() {
    for previous in [
        BillStatus::Pending,
        BillStatus::Completed,
        BillStatus::Cancelled,
    ] {
        for terminal in [BillStatus::Cancelled, BillStatus::Refunded] {
            let plan = EffectPlan::for_update(previous, terminal);
            assert!(!plan.memberships);
            assert!(!plan.wallet_debit);
            assert!(!plan.incentives);
            assert!(!plan.inventory);
            assert!(!plan.dashboard_fold);
        }
    }
}

#[test]
fn reopening_from_cancelled_to_completed_fires_completion_effects() {
    let plan = EffectPlan::for_update(BillStatus::Cancelled, BillStatus::Completed);
    assert!(plan.incentives);
    assert!(plan.inventory);
    assert!(plan.dashboard_fold);
}
