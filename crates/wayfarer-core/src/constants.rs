//! Shared constants

use rust_decimal::Decimal;

/// Prefix for every generated referral code (`NSV-XXXXXX`).
pub const REFERRAL_CODE_PREFIX: &str = "NSV";

/// Referral code alphabet: uppercase letters and digits without 0, O, 1 and I.
pub const REFERRAL_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const REFERRAL_CODE_LENGTH: usize = 6;

/// Attempts made to find an unused referral code before giving up.
pub const REFERRAL_CODE_MAX_ATTEMPTS: usize = 5;

pub const BOOKING_CODE_PREFIX: &str = "NSV";

/// Attempts made to find an unused booking code before a conversion gives up.
pub const BOOKING_CODE_MAX_ATTEMPTS: usize = 5;

pub const DEFAULT_BOOKING_CURRENCY: &str = "INR";

pub const DEFAULT_BOOKING_TYPE: &str = "custom";

pub const DEFAULT_LEAD_SOURCE: &str = "website";

pub const DEFAULT_ATTRIBUTION_WINDOW_DAYS: i32 = 30;

/// Commission applied when a request is approved without explicit terms.
pub const DEFAULT_COMMISSION_PERCENT: i64 = 5;

/// Largest amount a `NUMERIC(12, 2)` money column holds: 9999999999.99.
pub const MAX_MONEY_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

pub const LEAD_LIST_LIMIT: i64 = 100;

pub const AUDIT_LOG_DEFAULT_LIMIT: i64 = 100;

pub const AUDIT_LOG_MAX_LIMIT: i64 = 500;

pub const LEGAL_PDF_MAX_BYTES: usize = 10 * 1024 * 1024;

pub const LEGAL_PDF_CONTENT_TYPE: &str = "application/pdf";

pub const TOP_INFLUENCERS_LIMIT: i64 = 10;
