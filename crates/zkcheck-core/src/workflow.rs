//! Built-in definition of the bridge deposit workflow
//!
//! The deposit form walks through secret generation, amount entry, a
//! confirmation checkbox and the deposit-address request, then the
//! "sent" / mock-confirm / mint sequence that kicks off proof generation.
//! Every step is optional because the form renders differently depending
//! on wallet and network state.

use crate::types::{KeywordView, ResourceCheck, SelectorSpec, Step};

/// Exact console phrase emitted once the Poseidon note commitment exists
pub const NOTE_CREATED_MARKER: &str = "Poseidon note created";

/// Amount, in satoshis, entered in the amount step
pub const DEFAULT_DEPOSIT_AMOUNT: &str = "10000";

/// Ordered steps of the bridge deposit flow
pub fn deposit_flow() -> Vec<Step> {
    vec![
        Step::click("generate-secret", SelectorSpec::text("Generate"))
            .settle_ms(500)
            .checkpoint("secret"),
        Step::click("continue", SelectorSpec::text("Continue"))
            .settle_ms(500)
            .checkpoint("amount-page"),
        Step::fill(
            "enter-amount",
            SelectorSpec::typed_input("number"),
            DEFAULT_DEPOSIT_AMOUNT,
        )
        .settle_ms(500)
        .checkpoint("amount-entered"),
        // Native checkbox sits under a styled overlay; click its label or wrapper.
        Step::toggle("confirm-checkbox", SelectorSpec::labeled_checkbox())
            .or(SelectorSpec::structural("div > input[type=\"checkbox\"]"))
            .settle_ms(300),
        Step::click("get-deposit-address", SelectorSpec::text("Get Deposit Address"))
            .settle_ms(5000)
            .checkpoint("after-deposit"),
        Step::click("sent-btc", SelectorSpec::text("Sent the BTC"))
            .settle_ms(3000)
            .checkpoint("waiting-confirm"),
        Step::click("mock-confirm", SelectorSpec::text("Mock")).settle_ms(3000),
        Step::click("mint", SelectorSpec::text("Mint"))
            .settle_ms(10_000)
            .checkpoint("final"),
    ]
}

/// Circuit artifacts the client-side prover downloads
pub fn circuit_artifacts() -> Vec<ResourceCheck> {
    vec![
        ResourceCheck::new("/circuits/deposit.wasm"),
        ResourceCheck::new("/circuits/deposit_final.zkey"),
        ResourceCheck::new("/circuits/deposit_vk.json").with_content_type("application/json"),
    ]
}

/// Keyword views printed in the report
pub fn default_views() -> Vec<KeywordView> {
    vec![
        KeywordView::new("poseidon", ["poseidon", "commitment"]),
        KeywordView::new("zk-proof", ["zk", "proof", "snark", "circom"]),
        KeywordView::new(
            "deposit-flow",
            [
                "deposit",
                "zk",
                "poseidon",
                "proof",
                "commitment",
                "nullifier",
                "secret",
                "note",
                "circom",
                "snark",
                "groth16",
                "wasm",
                "zkey",
                "prepare",
                "mint",
                "amount",
                "taproot",
                "address",
            ],
        ),
    ]
}
