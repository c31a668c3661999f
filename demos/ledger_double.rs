//! Ledger Double - Faults, Callbacks, and Stateful Rules
//!
//! A settlement routine runs against a doubled account ledger. Beyond
//! recorded answers, this walkthrough covers the rest of the rule
//! vocabulary:
//!
//! 1. Declared faults raised for specific arguments (`throws_with`)
//! 2. Callbacks observing matching calls (`subscribe`)
//! 3. An implementation rule accumulating state across calls
//! 4. The not-stubbed fault for calls nobody prepared
//!
//! Run with: cargo run --example ledger_double

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use anyhow::Result;
use understudy::{contract, double_of, UnstubbedOperation};

contract! {
    /// The account store the settlement routine depends on.
    pub trait Ledger {
        fn balance_of(&self, account: String) -> u64;
        fn withdraw(&self, account: String, amount: u64) -> u64;
        fn deposit(&self, account: String, amount: u64) -> u64;
    }
    proxy LedgerProxy;
    selectors mod ledger;
}

/// Fault payload a withdraw rule raises when the account is short.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InsufficientFunds {
    account: String,
    requested: u64,
}

/// The routine under test: checks the source balance, then moves `amount`
/// across and reports both resulting balances.
fn settle(ledger: &impl Ledger, from: &str, to: &str, amount: u64) -> (u64, u64) {
    let available = ledger.balance_of(from.to_string());
    assert!(available >= amount, "settlement precondition");
    let left = ledger.withdraw(from.to_string(), amount);
    let right = ledger.deposit(to.to_string(), amount);
    (left, right)
}

/// Run `f` with the default panic hook silenced, so expected faults do not
/// spray backtraces over the demo output.
fn quietly<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(AssertUnwindSafe(f));
    std::panic::set_hook(hook);
    outcome
}

fn main() -> Result<()> {
    println!("=== Ledger Double ===\n");

    // =========================================================================
    // Step 1: Wire the ledger
    // =========================================================================

    println!("Step 1: Wiring the ledger double...\n");

    let audits = Rc::new(Cell::new(0u32));
    let audit_feed = audits.clone();

    let mut store = double_of::<dyn Ledger>();
    store
        .on(ledger::balance_of())
        .given((String::from("ada"),))
        .returns(90u64)
        .subscribe(move || audit_feed.set(audit_feed.get() + 1));
    store
        .on(ledger::withdraw())
        .given((String::from("ada"), 30u64))
        .returns(60u64);
    store
        .on(ledger::balance_of())
        .given((String::from("bob"),))
        .returns(500u64);
    store
        .on(ledger::withdraw())
        .given((String::from("bob"), 500u64))
        .throws_with(|| InsufficientFunds {
            account: String::from("bob"),
            requested: 500,
        });

    // Deposits land in one running vault; the closure keeps the total.
    let mut vault = 0u64;
    store.implement(ledger::deposit(), move |_account: String, amount: u64| {
        vault += amount;
        vault
    });

    println!("   ├─ balance_of(\"ada\")    -> 90, with an audit callback");
    println!("   ├─ withdraw(\"ada\", 30)  -> 60");
    println!("   ├─ balance_of(\"bob\")    -> 500");
    println!("   ├─ withdraw(\"bob\", 500) => raises InsufficientFunds");
    println!("   └─ deposit(_, amount)   => running vault total");

    // =========================================================================
    // Step 2: A settlement that goes through
    // =========================================================================

    println!("\nStep 2: Settling 30 from ada to bob...\n");

    let (left, right) = settle(store.instance(), "ada", "bob", 30);
    println!("   ada after withdraw:  {left}");
    println!("   vault after deposit: {right}");

    // The deposit closure keeps its total across settlements.
    let vault_now = store.instance().deposit(String::from("carol"), 12);
    println!("   vault after one more deposit: {vault_now}");
    println!("   audit callback fired {} time(s)", audits.get());

    // =========================================================================
    // Step 3: A settlement that faults
    // =========================================================================
    // The withdraw rule for bob raises a typed payload; the caller catches
    // the unwind and downcasts it.

    println!("\nStep 3: Settling 500 from bob to ada...\n");

    match quietly(|| settle(store.instance(), "bob", "ada", 500)) {
        Ok(_) => println!("   unexpectedly settled"),
        Err(payload) => match payload.downcast::<InsufficientFunds>() {
            Ok(fault) => {
                println!("   declared fault raised:");
                println!("   ├─ account:   {}", fault.account);
                println!("   └─ requested: {}", fault.requested);
            }
            Err(_) => println!("   some other panic payload"),
        },
    }

    // =========================================================================
    // Step 4: A call nobody prepared
    // =========================================================================

    println!("\nStep 4: Asking about an unknown account...\n");

    match quietly(|| store.instance().balance_of(String::from("eve"))) {
        Ok(_) => println!("   unexpectedly answered"),
        Err(payload) => match payload.downcast::<UnstubbedOperation>() {
            Ok(fault) => println!("   not-stubbed fault: {fault}"),
            Err(_) => println!("   some other panic payload"),
        },
    }

    println!("\n{}", "=".repeat(74));
    println!("\nWhat we demonstrated:");
    println!("   1. throws_with raised a fresh typed payload for a matching call");
    println!("   2. subscribe observed each matching call, and only matches");
    println!("   3. An implementation closure carried state across calls");
    println!("   4. Unprepared calls fault with the operation's full signature");
    println!("\n{}\n", "=".repeat(74));

    Ok(())
}
