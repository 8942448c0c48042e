//! Order number generation.

use chrono::Utc;
use uuid::Uuid;

/// Prefix shared by every generated order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Generates a human-scannable order number from the current UTC time and
/// a random suffix, e.g. `ORD-260827143022-4F7A9C21D3`.
///
/// The format makes collisions very unlikely but does not guarantee
/// uniqueness; the unique constraint on the order-number column is the
/// authority, and the service regenerates on conflict.
pub fn generate_order_number() -> String {
    let stamp = Utc::now().format("%y%m%d%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{ORDER_NUMBER_PREFIX}-{stamp}-{}", &suffix[..10])
}
