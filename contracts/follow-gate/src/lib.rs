#![no_std]

mod fees;
mod interfaces;

pub use interfaces::{
    FlowLedger, FlowState, GraphRegistry, ReceiptToken, TreasuryInfo, TreasuryRegistry,
};

use interfaces::{FlowLedgerClient, GraphRegistryClient, ReceiptTokenClient, TreasuryRegistryClient};
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token,
    xdr::FromXdr,
    Address, Bytes, Env,
};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Addresses of the collaborating protocol contracts, set once at `init`.
#[contracttype]
#[derive(Clone, Debug)]
pub struct Config {
    pub registry: Address,
    pub treasury_registry: Address,
    pub flow_ledger: Address,
}

/// Follow terms of a single profile.
///
/// Written by `initialize_profile` and immutable until the owning registry
/// re-initializes the profile. The same struct doubles as the wire form of
/// the configuration blob, so a successful `initialize_profile` echoes the
/// exact bytes it decoded.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileConfig {
    /// Receives both the one-time fee and the required payment stream.
    pub recipient: Address,
    /// Token the fee is paid in and the stream must run in. Checked against
    /// the treasury registry's allow-list at configuration time only.
    pub currency: Address,
    /// One-time follow fee. Zero means free to follow, stream-gated only.
    pub amount: i128,
    /// Required stream rate. Zero is rejected at configuration time.
    pub flow_rate: i128,
}

/// Caller-supplied follow terms, asserted against the stored configuration
/// to defend against front-running with stale terms.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FollowAssertion {
    pub currency: Address,
    pub amount: i128,
}

#[soroban_sdk::contracterror]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    /// Bad recipient, currency, or rate at profile setup time.
    InvalidConfiguration = 1,
    /// Receipt ownership or count precondition violated.
    FollowInvalid = 2,
    /// Caller-supplied terms disagree with the stored configuration.
    DataMismatch = 3,
    /// Fee transfer lacked balance or allowance.
    TransferFailed = 4,
    /// Stream rate wrong, or stream mutated after the recorded follow time.
    StreamInvalid = 5,
}

/// Namespace for all contract storage keys.
#[contracttype]
pub enum DataKey {
    Config,                   // Instance storage for collaborator wiring.
    ProfileConfig(u64),       // Persistent storage for per-profile follow terms.
    FollowedAt(u64, Address), // Persistent storage for admission timestamps.
}

const PERSISTENT_TTL_THRESHOLD: u32 = 17280;
const PERSISTENT_TTL_EXTEND: u32 = 120960;

// ---------------------------------------------------------------------------
// Storage helpers
// ---------------------------------------------------------------------------

fn get_module_config(env: &Env) -> Config {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .expect("contract not initialised: missing config")
}

fn load_profile_config(env: &Env, profile_id: u64) -> Option<ProfileConfig> {
    env.storage()
        .persistent()
        .get(&DataKey::ProfileConfig(profile_id))
}

fn save_profile_config(env: &Env, profile_id: u64, config: &ProfileConfig) {
    let key = DataKey::ProfileConfig(profile_id);
    env.storage().persistent().set(&key, config);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND);
}

fn load_followed_at(env: &Env, profile_id: u64, follower: &Address) -> u64 {
    env.storage()
        .persistent()
        .get(&DataKey::FollowedAt(profile_id, follower.clone()))
        .unwrap_or(0u64)
}

fn save_followed_at(env: &Env, profile_id: u64, follower: &Address, followed_at: u64) {
    let key = DataKey::FollowedAt(profile_id, follower.clone());
    env.storage().persistent().set(&key, &followed_at);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND);
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

impl FollowGate {
    fn resolve_receipt_contract(
        env: &Env,
        registry: &Address,
        profile_id: u64,
    ) -> Result<Address, ContractError> {
        GraphRegistryClient::new(env, registry)
            .receipt_contract(&profile_id)
            .ok_or(ContractError::FollowInvalid)
    }

    /// One leg of the fee collection. A zero leg is skipped entirely.
    fn collect_fee_part(
        env: &Env,
        currency: &Address,
        from: &Address,
        to: &Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        if amount == 0 {
            return Ok(());
        }
        let token_client = token::Client::new(env, currency);
        match token_client.try_transfer(from, to, &amount) {
            Ok(Ok(())) => Ok(()),
            _ => Err(ContractError::TransferFailed),
        }
    }
}

// ---------------------------------------------------------------------------
// Contract implementation
// ---------------------------------------------------------------------------

#[contract]
pub struct FollowGate;

#[contractimpl]
impl FollowGate {
    /// Initialise the module with the addresses of its collaborators.
    ///
    /// This function must be called exactly once before any other contract
    /// operations. It persists the social-graph registry (source of receipt
    /// contracts and the only caller allowed to configure profiles and
    /// process follows), the treasury registry (currency allow-list and
    /// protocol fee), and the flow ledger (payment-stream snapshots).
    ///
    /// # Panics
    /// - If called more than once (contract already initialised)
    pub fn init(env: Env, registry: Address, treasury_registry: Address, flow_ledger: Address) {
        if env.storage().instance().has(&DataKey::Config) {
            panic!("already initialised");
        }
        let config = Config {
            registry,
            treasury_registry,
            flow_ledger,
        };
        env.storage().instance().set(&DataKey::Config, &config);

        // Ensure instance storage (collaborator wiring) doesn't expire quickly
        env.storage()
            .instance()
            .extend_ttl(PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND);
    }

    /// Retrieve the module-level collaborator wiring.
    pub fn get_config(env: Env) -> Config {
        get_module_config(&env)
    }

    /// Configure the follow terms of a profile.
    ///
    /// Invoked by the owning registry during profile setup. The blob decodes
    /// into the four configuration fields (recipient, currency, one-time fee,
    /// required flow rate) and is echoed back unchanged on success, as a
    /// receipt for the caller.
    ///
    /// Re-invocation fully replaces any prior configuration for the profile;
    /// there is no partial update.
    ///
    /// # Parameters
    /// - `profile_id`: Profile being configured
    /// - `data`: XDR encoding of a [`ProfileConfig`]
    ///
    /// # Returns
    /// - The input blob, unchanged
    ///
    /// # Errors
    /// - `InvalidConfiguration`: the blob does not decode, `flow_rate` is not
    ///   positive, `amount` is negative, or the currency is not on the
    ///   treasury registry's allow-list
    ///
    /// # Authorization
    /// - Requires authorization from the registry address given at `init`
    pub fn initialize_profile(
        env: Env,
        profile_id: u64,
        data: Bytes,
    ) -> Result<Bytes, ContractError> {
        let module = get_module_config(&env);
        module.registry.require_auth();

        let config = ProfileConfig::from_xdr(&env, &data)
            .map_err(|_| ContractError::InvalidConfiguration)?;

        if config.flow_rate <= 0 || config.amount < 0 {
            return Err(ContractError::InvalidConfiguration);
        }

        // The allow-list is consulted at configuration time only; a later
        // de-listing does not retroactively invalidate the profile.
        let treasury_registry = TreasuryRegistryClient::new(&env, &module.treasury_registry);
        if !treasury_registry.is_currency_allowed(&config.currency) {
            return Err(ContractError::InvalidConfiguration);
        }

        save_profile_config(&env, profile_id, &config);

        env.events()
            .publish((symbol_short!("profinit"), profile_id), config.recipient);

        Ok(data)
    }

    /// Admit a follow: collect the one-time fee and checkpoint the stream.
    ///
    /// Invoked by the owning registry immediately after minting a follow
    /// receipt to `follower`. Each gate below is hard: the first failure
    /// aborts the whole operation, and the host rolls back every state
    /// change including completed fee transfers.
    ///
    /// 1. The profile must have a receipt contract (`FollowInvalid`).
    /// 2. The follower must hold exactly one receipt (`FollowInvalid`). The
    ///    registry mints before invoking, so a fresh follow is visible as a
    ///    balance of one; zero means the pre-mint contract was broken, more
    ///    than one means a prior follow already exists.
    /// 3. The supplied terms must decode to the stored (currency, amount)
    ///    exactly (`DataMismatch`), before any value moves.
    /// 4. The fee is split per the treasury registry's basis points, the
    ///    treasury absorbing truncation loss, and both legs are collected
    ///    from the follower (`TransferFailed`).
    /// 5. The live stream for (currency, follower, recipient) must run at
    ///    exactly the configured rate (`StreamInvalid`). There is no prior
    ///    checkpoint to compare timestamps against at admission time.
    ///
    /// On success the current ledger timestamp is recorded as the follow
    /// checkpoint, overwriting any earlier one.
    ///
    /// # Parameters
    /// - `follower`: Account following the profile; pays the fee
    /// - `profile_id`: Profile being followed
    /// - `data`: XDR encoding of a [`FollowAssertion`]
    ///
    /// # Authorization
    /// - Requires authorization from the registry and from the follower
    ///   (whose tokens are transferred)
    ///
    /// # Events
    /// - Publishes `followed(profile_id, follower)` on success
    pub fn process_follow(
        env: Env,
        follower: Address,
        profile_id: u64,
        data: Bytes,
    ) -> Result<(), ContractError> {
        let module = get_module_config(&env);
        module.registry.require_auth();
        follower.require_auth();

        let receipt_contract = Self::resolve_receipt_contract(&env, &module.registry, profile_id)?;

        let receipts = ReceiptTokenClient::new(&env, &receipt_contract);
        if receipts.balance(&follower) != 1 {
            return Err(ContractError::FollowInvalid);
        }

        let assertion =
            FollowAssertion::from_xdr(&env, &data).map_err(|_| ContractError::DataMismatch)?;
        let config = load_profile_config(&env, profile_id).ok_or(ContractError::DataMismatch)?;
        if assertion.currency != config.currency || assertion.amount != config.amount {
            return Err(ContractError::DataMismatch);
        }

        if config.amount > 0 {
            let info = TreasuryRegistryClient::new(&env, &module.treasury_registry).treasury_info();
            let (recipient_amount, treasury_amount) = fees::split(config.amount, info.fee_bps);
            Self::collect_fee_part(
                &env,
                &config.currency,
                &follower,
                &config.recipient,
                recipient_amount,
            )?;
            Self::collect_fee_part(
                &env,
                &config.currency,
                &follower,
                &info.treasury,
                treasury_amount,
            )?;
        }

        let flow = FlowLedgerClient::new(&env, &module.flow_ledger).flow_state(
            &config.currency,
            &follower,
            &config.recipient,
        );
        if flow.rate != config.flow_rate {
            return Err(ContractError::StreamInvalid);
        }

        save_followed_at(&env, profile_id, &follower, env.ledger().timestamp());

        env.events()
            .publish((symbol_short!("followed"), profile_id), follower);

        Ok(())
    }

    /// Check whether an account is a valid follower of a profile right now.
    ///
    /// Read-only; callable by anyone at any time after (or without) a
    /// follow. `receipt_id` of zero means "any receipt": the follower must
    /// then hold at least one receipt for the profile. A non-zero
    /// `receipt_id` must be owned by the follower.
    ///
    /// The stream-consistency rule: the live rate must equal the configured
    /// rate, and if an admission checkpoint is recorded, the stream's last
    /// mutation must not be later than it. The comparison is `<=`, not `<`:
    /// a mutation in the same ledger second as the admission still counts
    /// as valid. Any strictly later mutation invalidates the follow until
    /// the account re-follows, including a rate change that was since
    /// reverted and a delete-and-recreate at the identical rate.
    ///
    /// # Errors
    /// - `FollowInvalid`: no receipt class, or the receipt ownership check
    ///   fails
    /// - `StreamInvalid`: profile not configured, rate mismatch, or the
    ///   stream was mutated after the admission checkpoint
    pub fn validate_follow(
        env: Env,
        profile_id: u64,
        follower: Address,
        receipt_id: u64,
    ) -> Result<(), ContractError> {
        let module = get_module_config(&env);

        let receipt_contract = Self::resolve_receipt_contract(&env, &module.registry, profile_id)?;
        let receipts = ReceiptTokenClient::new(&env, &receipt_contract);
        if receipt_id == 0 {
            if receipts.balance(&follower) < 1 {
                return Err(ContractError::FollowInvalid);
            }
        } else {
            // A receipt contract may trap on ids it never minted; that
            // counts as "not owned", the same as a mismatched holder.
            match receipts.try_owner_of(&receipt_id) {
                Ok(Ok(owner)) if owner == follower => {}
                _ => return Err(ContractError::FollowInvalid),
            }
        }

        let config = load_profile_config(&env, profile_id).ok_or(ContractError::StreamInvalid)?;

        let flow = FlowLedgerClient::new(&env, &module.flow_ledger).flow_state(
            &config.currency,
            &follower,
            &config.recipient,
        );
        if flow.rate != config.flow_rate {
            return Err(ContractError::StreamInvalid);
        }

        let followed_at = load_followed_at(&env, profile_id, &follower);
        if followed_at != 0 && flow.last_updated_at > followed_at {
            return Err(ContractError::StreamInvalid);
        }

        Ok(())
    }

    /// Hook invoked by the registry when a follow receipt changes hands.
    ///
    /// Deliberately a no-op. The admission timestamp stays bound to the
    /// original follower's address, not the receipt, so a transferred
    /// receipt fails `validate_follow` unless the new holder independently
    /// runs a matching stream.
    pub fn transfer_hook(env: Env, profile_id: u64, from: Address, to: Address, receipt_id: u64) {
        let _ = (env, profile_id, from, to, receipt_id);
    }

    /// Stored follow terms of a profile, or `None` if never configured.
    pub fn get_profile_config(env: Env, profile_id: u64) -> Option<ProfileConfig> {
        load_profile_config(&env, profile_id)
    }

    /// Ledger timestamp of the follower's admission, zero if never admitted.
    pub fn get_followed_at(env: Env, profile_id: u64, follower: Address) -> u64 {
        load_followed_at(&env, profile_id, &follower)
    }
}
