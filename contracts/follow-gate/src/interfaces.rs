//! Interfaces of the collaborating protocol contracts.
//!
//! The follow gate owns none of these: the social-graph registry mints and
//! burns follow receipts, the treasury registry curates the currency
//! allow-list and the protocol fee, and the flow ledger tracks continuous
//! payment streams. The gate only ever calls through the clients generated
//! here, against addresses supplied at `init`.

use soroban_sdk::{contractclient, contracttype, Address, Env};

/// Snapshot of a continuous payment stream, as reported by the flow ledger.
///
/// The ledger keeps no history: the pair (last mutation time, current rate)
/// is the only observable state of a flow. A flow that does not exist reads
/// as `(0, 0)`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlowState {
    pub last_updated_at: u64,
    pub rate: i128,
}

/// Protocol treasury address and its fee share in basis points.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreasuryInfo {
    pub treasury: Address,
    pub fee_bps: u32,
}

/// The social-graph registry that owns profile identity.
#[contractclient(name = "GraphRegistryClient")]
pub trait GraphRegistry {
    /// Receipt token contract minted for a profile, or `None` if the
    /// profile has no receipt class.
    fn receipt_contract(env: Env, profile_id: u64) -> Option<Address>;
}

/// Follow receipts, viewed as transferable capability tokens.
#[contractclient(name = "ReceiptTokenClient")]
pub trait ReceiptToken {
    /// Number of receipts held by `owner` for this profile.
    fn balance(env: Env, owner: Address) -> u32;

    /// Holder of a specific receipt.
    fn owner_of(env: Env, receipt_id: u64) -> Address;
}

/// Currency allow-list and treasury configuration registry.
#[contractclient(name = "TreasuryRegistryClient")]
pub trait TreasuryRegistry {
    fn is_currency_allowed(env: Env, currency: Address) -> bool;

    fn treasury_info(env: Env) -> TreasuryInfo;
}

/// The payment-stream ledger, keyed by (currency, sender, receiver).
#[contractclient(name = "FlowLedgerClient")]
pub trait FlowLedger {
    fn flow_state(env: Env, currency: Address, sender: Address, receiver: Address) -> FlowState;
}
