use engagement_core::{
    KeyValueStore, LedgerError, MemoryKeyValueStore, SqliteKeyValueStore, TokenLedger,
    TOKEN_BALANCE_KEY,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

#[test]
fn fresh_ledger_starts_at_zero() {
    let ledger = TokenLedger::load(MemoryKeyValueStore::new());
    assert_eq!(ledger.balance(), 0);
}

#[test]
fn debit_and_credit_scenario() {
    let mut ledger = TokenLedger::load(MemoryKeyValueStore::new());
    ledger.credit(100.0).unwrap();

    assert!(ledger.debit(30.0).unwrap());
    assert_eq!(ledger.balance(), 70);

    assert!(!ledger.debit(1000.0).unwrap());
    assert_eq!(ledger.balance(), 70);

    ledger.credit(-5.0).unwrap();
    assert_eq!(ledger.balance(), 70);
}

#[test]
fn amounts_are_floored_and_negative_amounts_are_zero() {
    let mut ledger = TokenLedger::load(MemoryKeyValueStore::new());
    assert_eq!(ledger.credit(10.9).unwrap(), 10);
    assert!(ledger.debit(2.7).unwrap());
    assert_eq!(ledger.balance(), 8);

    assert!(ledger.debit(-40.0).unwrap());
    assert_eq!(ledger.balance(), 8);
    assert_eq!(ledger.credit(f64::NAN).unwrap(), 8);
}

#[test]
fn debit_of_exact_balance_succeeds_and_empties_ledger() {
    let mut ledger = TokenLedger::load(MemoryKeyValueStore::new());
    ledger.credit(15.0).unwrap();
    assert!(ledger.can_afford(15.0));
    assert!(ledger.debit(15.0).unwrap());
    assert_eq!(ledger.balance(), 0);
    assert!(!ledger.can_afford(1.0));
}

#[test]
fn random_operation_sequence_never_goes_negative_and_debits_exactly() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut ledger = TokenLedger::load(MemoryKeyValueStore::new());

    for _ in 0..500 {
        let amount: f64 = rng.gen_range(-20.0..60.0);
        let before = ledger.balance();
        if rng.gen_bool(0.5) {
            let after = ledger.credit(amount).unwrap();
            assert!(after >= before);
        } else {
            let expected = amount.max(0.0).floor() as u64;
            let applied = ledger.debit(amount).unwrap();
            assert_eq!(applied, expected <= before);
            if applied {
                assert_eq!(ledger.balance(), before - expected);
            } else {
                assert_eq!(ledger.balance(), before);
            }
        }
    }
}

#[test]
fn every_mutation_is_persisted() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let mut ledger = TokenLedger::load(Arc::clone(&store));

    ledger.credit(42.0).unwrap();
    assert_eq!(store.get(TOKEN_BALANCE_KEY).unwrap().as_deref(), Some("42"));

    ledger.debit(2.0).unwrap();
    assert_eq!(store.get(TOKEN_BALANCE_KEY).unwrap().as_deref(), Some("40"));

    ledger.reset().unwrap();
    assert_eq!(store.get(TOKEN_BALANCE_KEY).unwrap().as_deref(), Some("0"));
    assert_eq!(ledger.balance(), 0);
}

#[test]
fn reload_reconstructs_last_committed_balance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    {
        let mut ledger = TokenLedger::load(SqliteKeyValueStore::open(&path).unwrap());
        ledger.credit(120.0).unwrap();
        assert!(ledger.debit(20.0).unwrap());
    }

    let ledger = TokenLedger::load(SqliteKeyValueStore::open(&path).unwrap());
    assert_eq!(ledger.balance(), 100);
}

#[test]
fn malformed_persisted_balance_falls_back_to_zero() {
    for raw in ["", "abc", "-10", "12.5"] {
        let store = MemoryKeyValueStore::with_entries([(TOKEN_BALANCE_KEY, raw)]);
        let ledger = TokenLedger::load(store);
        assert_eq!(ledger.balance(), 0, "raw value `{raw}`");
    }
}

#[test]
fn failed_write_leaves_balance_unchanged() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let mut ledger = TokenLedger::load(Arc::clone(&store));
    ledger.credit(50.0).unwrap();

    store.set_read_only(true);
    let err = ledger.debit(10.0).unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)));
    assert_eq!(ledger.balance(), 50);
    assert!(ledger.credit(5.0).is_err());
    assert_eq!(ledger.balance(), 50);

    store.set_read_only(false);
    assert_eq!(store.get(TOKEN_BALANCE_KEY).unwrap().as_deref(), Some("50"));
    assert!(ledger.debit(10.0).unwrap());
    assert_eq!(ledger.balance(), 40);
}

#[test]
fn insufficient_debit_does_not_write() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let mut ledger = TokenLedger::load(Arc::clone(&store));

    store.set_read_only(true);
    assert!(!ledger.debit(1.0).unwrap());
    assert_eq!(ledger.balance(), 0);
}
