//! System-wide constants for the Matchpot ledger.

use rust_decimal::Decimal;

/// Default minimum deposit amount.
pub const DEFAULT_MINIMUM_DEPOSIT: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Default minimum withdrawal amount.
pub const DEFAULT_MINIMUM_WITHDRAWAL: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Maximum length of an external payment reference.
pub const MAX_PAYMENT_REF_LEN: usize = 64;

/// Maximum length of a withdrawal destination (UPI handle / account).
pub const MAX_DESTINATION_LEN: usize = 128;

/// Maximum decimal places accepted on monetary input.
pub const MONEY_SCALE: u32 = 2;

