//! Fee-split arithmetic for follow admission.

/// Basis-point denominator used by the treasury registry.
pub const BPS_DENOMINATOR: i128 = 10_000;

/// Split a one-time follow fee between the profile recipient and the
/// protocol treasury.
///
/// Returns `(recipient_amount, treasury_amount)`. The treasury share is
/// rounded down, so truncation loss falls on the treasury and never on the
/// recipient; the two parts always sum back to `amount`.
pub fn split(amount: i128, fee_bps: u32) -> (i128, i128) {
    let treasury_amount = amount
        .checked_mul(fee_bps as i128)
        .expect("overflow calculating treasury share")
        / BPS_DENOMINATOR;
    (amount - treasury_amount, treasury_amount)
}
