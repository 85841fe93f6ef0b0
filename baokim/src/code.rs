//! Gateway response-code classification.
//!
//! Every gateway response carries a numeric `code`. A closed set of codes
//! means success (including "processing" and "success, redirect required");
//! everything else, including codes this table has never seen, is a business
//! failure.

/// Codes the gateway uses for a successful or accepted request.
pub const SUCCESS_CODES: [i64; 4] = [0, 100, 101, 200];

/// Known gateway codes and their messages.
const MESSAGES: &[(i64, &str)] = &[
    (0, "Success"),
    (100, "Processing"),
    (101, "Success, redirect required"),
    (102, "Error from service provider"),
    (103, "Invalid digital signature"),
    (104, "Invalid signature"),
    (111, "Authentication failed"),
    (115, "Transaction has no bank account information"),
    (200, "Success"),
    (422, "Invalid input data"),
    (707, "Merchant order id already exists"),
];

/// Outcome of classifying a response code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Whether the code is in the success set.
    pub success: bool,
    /// Human-readable description of the code.
    pub message: String,
}

/// Returns `true` iff `code` is one of [`SUCCESS_CODES`].
#[must_use]
pub fn is_success(code: i64) -> bool {
    SUCCESS_CODES.contains(&code)
}

/// Returns the table message for a known code.
#[must_use]
pub fn known_message(code: i64) -> Option<&'static str> {
    MESSAGES
        .iter()
        .find_map(|&(known, message)| (known == code).then_some(message))
}

/// Classifies a gateway response code.
#[must_use]
pub fn classify(code: i64) -> Classification {
    Classification {
        success: is_success(code),
        message: known_message(code)
            .map_or_else(|| format!("unrecognized code {code}"), str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_set_is_exact() {
        for code in [0, 100, 101, 200] {
            assert!(classify(code).success, "code {code} should succeed");
        }
    }

    #[test]
    fn every_table_code_outside_success_set_fails() {
        for &(code, message) in MESSAGES {
            let c = classify(code);
            assert_eq!(c.message, message);
            assert_eq!(c.success, SUCCESS_CODES.contains(&code));
        }
    }

    #[test]
    fn known_failure_codes() {
        assert_eq!(
            classify(102),
            Classification {
                success: false,
                message: "Error from service provider".into()
            }
        );
        assert!(!classify(103).success);
        assert!(!classify(104).success);
        assert_eq!(classify(111).message, "Authentication failed");
        assert!(!classify(115).success);
        assert_eq!(classify(422).message, "Invalid input data");
        assert_eq!(classify(707).message, "Merchant order id already exists");
    }

    #[test]
    fn unknown_codes_fail_with_fallback_message() {
        for code in [-1, 1, 99, 201, 400, 404, 500, 999, i64::MAX, i64::MIN] {
            let c = classify(code);
            assert!(!c.success, "code {code} should fail");
            assert_eq!(c.message, format!("unrecognized code {code}"));
        }
    }

    #[test]
    fn success_codes_all_have_messages() {
        for code in SUCCESS_CODES {
            assert!(known_message(code).is_some());
        }
    }

    #[test]
    fn table_has_no_duplicate_codes() {
        let mut codes: Vec<i64> = MESSAGES.iter().map(|&(c, _)| c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), MESSAGES.len());
    }
}
