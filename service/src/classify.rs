//! Maps wallet and chain failures onto user-facing notifications.
//!
//! Structured provider codes are consulted first. Wallets word their messages
//! differently across vendors and versions, so the text rules below are only a
//! fallback, evaluated strictly in table order: the first match wins.

use crate::error::{DispatchError, CHAIN_DISCONNECTED, UNRECOGNIZED_CHAIN, USER_REJECTED_REQUEST};

pub const INSUFFICIENT_FUNDS_TITLE: &str = "Insufficient Testnet ETH";
pub const INSUFFICIENT_FUNDS_MESSAGE: &str = "You need Base Sepolia testnet ETH to complete this transaction. Visit the Coinbase Base Sepolia Faucet to get free testnet ETH.";
pub const NETWORK_SWITCH_TITLE: &str = "Network Switch Required";
pub const USER_REJECTED_TITLE: &str = "Transaction Rejected";
pub const USER_REJECTED_MESSAGE: &str = "Transaction rejected in wallet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserRejected,
    NetworkMismatch,
    InsufficientFunds,
    Generic,
}

/// A failure reduced to what classification needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawError {
    pub code: Option<i64>,
    pub message: String,
}

impl RawError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl From<&DispatchError> for RawError {
    fn from(err: &DispatchError) -> Self {
        match err {
            DispatchError::Wallet(e) | DispatchError::Rpc(e) => Self {
                code: e.code,
                message: e.message.clone(),
            },
            other => Self::new(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    pub title: String,
    pub message: String,
}

enum Matcher {
    /// Substring match after lowercasing the message.
    Insensitive(&'static str),
    /// Substring match on the message as given.
    Exact(&'static str),
}

impl Matcher {
    fn matches(&self, message: &str, lowered: &str) -> bool {
        match self {
            Matcher::Insensitive(needle) => lowered.contains(needle),
            Matcher::Exact(needle) => message.contains(needle),
        }
    }
}

const TEXT_RULES: &[(ErrorCategory, &[Matcher])] = &[
    (
        ErrorCategory::UserRejected,
        &[
            Matcher::Insensitive("user rejected"),
            Matcher::Insensitive("rejected by user"),
            Matcher::Insensitive("rejected the request"),
            Matcher::Insensitive("user denied"),
            Matcher::Insensitive("transaction cancelled"),
        ],
    ),
    (
        ErrorCategory::NetworkMismatch,
        &[Matcher::Exact("network"), Matcher::Exact("chain")],
    ),
    (
        ErrorCategory::InsufficientFunds,
        &[
            Matcher::Insensitive("insufficient funds"),
            Matcher::Insensitive("insufficient balance"),
            Matcher::Insensitive("deposit more"),
            Matcher::Insensitive("eth"),
        ],
    ),
];

fn category_for_code(code: i64) -> Option<ErrorCategory> {
    match code {
        USER_REJECTED_REQUEST => Some(ErrorCategory::UserRejected),
        UNRECOGNIZED_CHAIN | CHAIN_DISCONNECTED => Some(ErrorCategory::NetworkMismatch),
        _ => None,
    }
}

fn category_for_text(message: &str) -> ErrorCategory {
    let lowered = message.to_lowercase();
    TEXT_RULES
        .iter()
        .find(|(_, matchers)| matchers.iter().any(|m| m.matches(message, &lowered)))
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::Generic)
}

pub fn classify(raw: &RawError, default_title: &str) -> Classification {
    let category = raw
        .code
        .and_then(category_for_code)
        .unwrap_or_else(|| category_for_text(&raw.message));

    let (title, message) = match category {
        ErrorCategory::UserRejected => (
            USER_REJECTED_TITLE.to_string(),
            USER_REJECTED_MESSAGE.to_string(),
        ),
        ErrorCategory::NetworkMismatch => (NETWORK_SWITCH_TITLE.to_string(), raw.message.clone()),
        ErrorCategory::InsufficientFunds => (
            INSUFFICIENT_FUNDS_TITLE.to_string(),
            INSUFFICIENT_FUNDS_MESSAGE.to_string(),
        ),
        ErrorCategory::Generic => (default_title.to_string(), format!("Error: {}", raw.message)),
    };

    Classification {
        category,
        title,
        message,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

/// Surface for user-facing notifications.
pub trait Toaster {
    fn toast(&self, toast: Toast);
}

pub struct ErrorHandlerOptions<'a> {
    pub default_title: &'a str,
    pub toaster: Option<&'a dyn Toaster>,
}

/// Reports a failed transaction to the user.
///
/// The submitting flag is cleared on every path. Returns `true` when the error
/// fell into one of the specific categories (a rejection is handled silently),
/// `false` for the generic fallback or when there is nowhere to report to.
pub fn handle_transaction_error(
    error: &RawError,
    options: &ErrorHandlerOptions<'_>,
    submitting: Option<&mut bool>,
) -> bool {
    report_transaction_error(error, options, submitting)
        .is_some_and(|c| c.category != ErrorCategory::Generic)
}

/// Same as [`handle_transaction_error`], handing back the classification that
/// was shown. `None` when no toaster was supplied.
pub fn report_transaction_error(
    error: &RawError,
    options: &ErrorHandlerOptions<'_>,
    submitting: Option<&mut bool>,
) -> Option<Classification> {
    tracing::error!("{}: {}", options.default_title, error.message);
    if let Some(flag) = submitting {
        *flag = false;
    }

    let Some(toaster) = options.toaster else {
        tracing::error!("No toaster provided to handle_transaction_error");
        return None;
    };

    let classification = classify(error, options.default_title);
    if classification.category == ErrorCategory::UserRejected {
        tracing::info!("Transaction was rejected by the user");
        return Some(classification);
    }

    toaster.toast(Toast {
        title: classification.title.clone(),
        description: classification.message.clone(),
        variant: ToastVariant::Destructive,
    });
    Some(classification)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct RecordingToaster {
        toasts: RefCell<Vec<Toast>>,
    }

    impl Toaster for RecordingToaster {
        fn toast(&self, toast: Toast) {
            self.toasts.borrow_mut().push(toast);
        }
    }

    fn category(message: &str) -> ErrorCategory {
        classify(&RawError::new(message), "Registration Failed").category
    }

    #[test]
    fn rejection_phrases_are_user_rejected() {
        for message in [
            "User rejected the request.",
            "MetaMask Tx Signature: User denied transaction signature.",
            "Request rejected by user",
            "The user rejected the request",
            "Transaction cancelled",
        ] {
            assert_eq!(category(message), ErrorCategory::UserRejected, "{message}");
        }
    }

    #[test]
    fn rejection_wins_over_network_wording() {
        assert_eq!(
            category("User rejected the request to switch network"),
            ErrorCategory::UserRejected
        );
    }

    #[test]
    fn network_wording_wins_over_funds() {
        assert_eq!(
            category("insufficient funds on this chain"),
            ErrorCategory::NetworkMismatch
        );
        let c = classify(
            &RawError::new("Please approve switching to the Base Sepolia network in your wallet to proceed."),
            "Registration Failed",
        );
        assert_eq!(c.category, ErrorCategory::NetworkMismatch);
        assert_eq!(c.title, NETWORK_SWITCH_TITLE);
        assert!(c.message.starts_with("Please approve switching"));
    }

    #[test]
    fn insufficient_funds_uses_fixed_message() {
        let c = classify(&RawError::new("insufficient funds for gas"), "Registration Failed");
        assert_eq!(c.category, ErrorCategory::InsufficientFunds);
        assert_eq!(c.title, INSUFFICIENT_FUNDS_TITLE);
        assert_eq!(c.message, INSUFFICIENT_FUNDS_MESSAGE);

        assert_eq!(category("Insufficient Balance"), ErrorCategory::InsufficientFunds);
        assert_eq!(category("please DEPOSIT MORE"), ErrorCategory::InsufficientFunds);
        assert_eq!(category("not enough ETH"), ErrorCategory::InsufficientFunds);
    }

    #[test]
    fn unmatched_messages_are_generic() {
        let c = classify(&RawError::new("execution reverted"), "Registration Failed");
        assert_eq!(c.category, ErrorCategory::Generic);
        assert_eq!(c.title, "Registration Failed");
        assert_eq!(c.message, "Error: execution reverted");
    }

    #[test]
    fn codes_take_precedence_over_text() {
        let c = classify(
            &RawError::with_code(USER_REJECTED_REQUEST, "insufficient funds"),
            "Registration Failed",
        );
        assert_eq!(c.category, ErrorCategory::UserRejected);

        let c = classify(
            &RawError::with_code(UNRECOGNIZED_CHAIN, "Unrecognized id 0x14a34"),
            "Registration Failed",
        );
        assert_eq!(c.category, ErrorCategory::NetworkMismatch);

        // Unmapped codes fall through to the text table.
        let c = classify(
            &RawError::with_code(-32000, "insufficient funds for gas * price + value"),
            "Registration Failed",
        );
        assert_eq!(c.category, ErrorCategory::InsufficientFunds);
    }

    #[test]
    fn rejection_clears_flag_without_toast() {
        let toaster = RecordingToaster::default();
        let options = ErrorHandlerOptions {
            default_title: "Registration Failed",
            toaster: Some(&toaster),
        };
        let mut submitting = true;

        let handled = handle_transaction_error(
            &RawError::new("User rejected the request"),
            &options,
            Some(&mut submitting),
        );

        assert!(handled);
        assert!(!submitting);
        assert!(toaster.toasts.borrow().is_empty());
    }

    #[test]
    fn generic_failure_toasts_and_is_unhandled() {
        let toaster = RecordingToaster::default();
        let options = ErrorHandlerOptions {
            default_title: "Registration Failed",
            toaster: Some(&toaster),
        };
        let mut submitting = true;

        let handled = handle_transaction_error(
            &RawError::new("execution reverted"),
            &options,
            Some(&mut submitting),
        );

        assert!(!handled);
        assert!(!submitting);
        let toasts = toaster.toasts.borrow();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].title, "Registration Failed");
        assert_eq!(toasts[0].description, "Error: execution reverted");
        assert_eq!(toasts[0].variant, ToastVariant::Destructive);
    }

    #[test]
    fn missing_toaster_still_clears_flag() {
        let options = ErrorHandlerOptions {
            default_title: "Registration Failed",
            toaster: None,
        };
        let mut submitting = true;
        assert!(!handle_transaction_error(
            &RawError::new("insufficient funds"),
            &options,
            Some(&mut submitting)
        ));
        assert!(!submitting);
    }

    #[test]
    fn report_returns_the_classification_it_showed() {
        let toaster = RecordingToaster::default();
        let options = ErrorHandlerOptions {
            default_title: "Status Update Failed",
            toaster: Some(&toaster),
        };

        let rejected = report_transaction_error(
            &RawError::with_code(USER_REJECTED_REQUEST, "declined"),
            &options,
            None,
        )
        .unwrap();
        assert_eq!(rejected.category, ErrorCategory::UserRejected);
        assert!(toaster.toasts.borrow().is_empty());

        let funds = report_transaction_error(&RawError::new("insufficient funds"), &options, None)
            .unwrap();
        assert_eq!(funds.category, ErrorCategory::InsufficientFunds);
        assert_eq!(toaster.toasts.borrow()[0].title, funds.title);

        let no_toaster = ErrorHandlerOptions {
            default_title: "Status Update Failed",
            toaster: None,
        };
        assert!(report_transaction_error(&RawError::new("x"), &no_toaster, None).is_none());
    }

    #[test]
    fn dispatch_errors_keep_provider_codes() {
        let err = DispatchError::Wallet(crate::error::ProviderRpcError::new(
            USER_REJECTED_REQUEST,
            "MetaMask: request declined",
        ));
        let raw = RawError::from(&err);
        assert_eq!(raw.code, Some(USER_REJECTED_REQUEST));
        assert_eq!(
            classify(&raw, "Registration Failed").category,
            ErrorCategory::UserRejected
        );
    }
}
