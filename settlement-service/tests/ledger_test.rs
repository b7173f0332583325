use chrono::Utc;
use service_core::error::AppError;
use settlement_service::models::{
    EntryKind, TxCategory, TxReference, Wallet, WalletTransaction,
};
use uuid::Uuid;

fn wallet(balance: f64, frozen: bool) -> Wallet {
    Wallet {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        balance,
        total_credits: 0.0,
        total_debits: 0.0,
        last_transaction_at: None,
        is_active: true,
        is_frozen: frozen,
        freeze_reason: if frozen { Some("chargeback".into()) } else { None },
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn debit_exceeding_balance_is_rejected_without_mutation() {
    let w = wallet(100.0, false);
    let err = w.ensure_can_debit(150.0).unwrap_err();
    match err {
        AppError::InsufficientFunds {
            required,
            available,
        } => {
            assert_eq!(required, 150.0);
            assert_eq!(available, 100.0);
        }
        other => panic!("expected InsufficientFunds, got {other}"),
    }
    // The guard never touched the snapshot.
    assert_eq!(w.balance, 100.0);
}

#[test]
fn debit_within_balance_passes_the_guard() {
    let w = wallet(100.0, false);
    assert!(w.ensure_can_debit(100.0).is_ok());
    assert!(w.ensure_can_debit(40.0).is_ok());
}

#[test]
fn frozen_wallet_rejects_debits_and_credits() {
    let w = wallet(1_000.0, true);
    assert!(matches!(
        w.ensure_can_debit(10.0),
        Err(AppError::WalletFrozen(_))
    ));
    assert!(matches!(
        w.ensure_can_credit(),
        Err(AppError::WalletFrozen(_))
    ));
}

#[test]
fn credit_transaction_snapshot_matches_balance_movement() {
    // Wallet at 50, membership credit of 200 already applied by the store.
    let mut w = wallet(50.0, false);
    w.balance += 200.0;
    w.total_credits += 200.0;

    let tx = WalletTransaction::for_applied_entry(
        &w,
        "WT-1754550000000-1".to_string(),
        EntryKind::Credit,
        200.0,
        "Value added from membership: Gold Wallet Pack".to_string(),
        TxCategory::MembershipCredit,
        TxReference::for_membership(Some(Uuid::new_v4()), "Gold Wallet Pack"),
        Uuid::new_v4(),
    );

    assert_eq!(tx.balance_before, 50.0);
    assert_eq!(tx.balance_after, 250.0);
    assert_eq!(tx.balance_after - tx.balance_before, tx.amount);
    assert_eq!(tx.category, TxCategory::MembershipCredit);
    assert_eq!(tx.kind, EntryKind::Credit);
    assert_eq!(tx.wallet_id, w.id);
    assert_eq!(tx.client_id, w.client_id);
}

#[test]
fn debit_transaction_snapshot_matches_balance_movement() {
    let mut w = wallet(500.0, false);
    w.balance -= 120.0;
    w.total_debits += 120.0;

    let bill_id = Uuid::new_v4();
    let tx = WalletTransaction::for_applied_entry(
        &w,
        "WT-1754550000000-2".to_string(),
        EntryKind::Debit,
        120.0,
        "Payment for bill: BILL-2026-7".to_string(),
        TxCategory::BillPayment,
        TxReference::for_bill(bill_id, "BILL-2026-7"),
        Uuid::new_v4(),
    );

    assert_eq!(tx.balance_before, 500.0);
    assert_eq!(tx.balance_after, 380.0);
    assert_eq!(tx.balance_before - tx.balance_after, tx.amount);
    assert_eq!(tx.reference.bill_id, Some(bill_id));
    assert_eq!(tx.reference.bill_number.as_deref(), Some("BILL-2026-7"));
}
