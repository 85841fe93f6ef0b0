//! Request identifiers.
//!
//! Every payload carries a `request_id` of the form
//! `{sub_merchant_code}_{YYYYMMDDHHMMSS}_{suffix}` where the timestamp is
//! gateway local time and the suffix is 12 random lowercase hex digits.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::time::format_compact_time;

/// Number of hex digits in the random suffix.
pub const SUFFIX_LEN: usize = 12;

/// Generates a request id for the current instant.
#[must_use]
pub fn generate(sub_merchant_code: &str) -> String {
    generate_at(sub_merchant_code, Utc::now())
}

/// Generates a request id for a given instant.
#[must_use]
pub fn generate_at(sub_merchant_code: &str, instant: DateTime<Utc>) -> String {
    let suffix: u64 = rand::thread_rng().gen_range(0..1 << (SUFFIX_LEN * 4));
    format!(
        "{sub_merchant_code}_{}_{suffix:0width$x}",
        format_compact_time(instant),
        width = SUFFIX_LEN
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn has_expected_shape() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 2, 4, 5).single().unwrap();
        let id = generate_at("SUB01", instant);
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SUB01");
        assert_eq!(parts[1], "20240315090405");
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn thousand_sequential_ids_are_distinct() {
        let ids: HashSet<String> = (0..1000).map(|_| generate("SUB")).collect();
        assert_eq!(ids.len(), 1000);
    }
}
