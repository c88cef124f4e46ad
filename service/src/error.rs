use std::fmt;

use alloy::transports::{RpcError, TransportErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{bindings::ContractName, registry::RegistryError};

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// EIP-1193: the requested method or account has not been authorized.
pub const UNAUTHORIZED: i64 = 4100;
/// EIP-1193: the provider does not support the method.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// EIP-1193: the provider is not connected to the requested chain.
pub const CHAIN_DISCONNECTED: i64 = 4901;
/// Widely implemented (MetaMask, Coinbase Wallet): unrecognized chain id.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// JSON-RPC invalid params.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC internal error.
pub const INTERNAL_ERROR: i64 = -32603;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// An error as reported by a wallet provider or an RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRpcError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProviderRpcError {}

impl From<RpcError<TransportErrorKind>> for ProviderRpcError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self::new(payload.code, payload.message.to_string()),
            other => Self::message(other.to_string()),
        }
    }
}

/// Device class used to word the "no wallet" guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ["iphone", "ipad", "ipod", "android"]
            .iter()
            .any(|marker| ua.contains(marker))
        {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    fn wallet_guidance(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => {
                "Please use a mobile crypto wallet browser like MetaMask Mobile or Coinbase Wallet."
            }
            DeviceClass::Desktop => {
                "Please install MetaMask or Coinbase Wallet browser extension and refresh the page."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Contract \"{0}\" is not registered")]
    UnknownContract(String),

    #[error("Invalid contract registry: {0}")]
    Registry(RegistryError),

    #[error("Function \"{function}\" not found in {contract} ABI. Check your contract deployment and ABI definition.")]
    FunctionNotFound {
        contract: ContractName,
        function: String,
    },

    #[error("Invalid arguments for {contract}.{function}: {reason}")]
    AbiEncoding {
        contract: ContractName,
        function: String,
        reason: String,
    },

    #[error("Could not decode {contract}.{function} result: {reason}")]
    AbiDecoding {
        contract: ContractName,
        function: String,
        reason: String,
    },

    #[error("No wallet provider found. {}", .0.wallet_guidance())]
    WalletUnavailable(DeviceClass),

    #[error("No wallet account connected. Please connect your wallet in the browser extension and try again.")]
    NoAccount,

    #[error("Could not access your wallet accounts. Please ensure your wallet is unlocked and this site has permission to access your accounts.")]
    AccountAccess(#[source] ProviderRpcError),

    #[error("Could not read the wallet's current chain: {0}")]
    ChainQuery(#[source] ProviderRpcError),

    #[error("Wallet reported an invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("Please approve switching to the {chain_name} network in your wallet to proceed.")]
    ChainSwitchDeclined { chain_name: String },

    #[error("Please add the {chain_name} network to your wallet manually. Chain ID: {chain_id}")]
    ChainAddFailed {
        chain_name: String,
        chain_id: u64,
        #[source]
        source: ProviderRpcError,
    },

    #[error("Unable to switch to {chain_name} network. Please switch networks manually in your wallet.")]
    ChainSwitchFailed {
        chain_name: String,
        #[source]
        source: ProviderRpcError,
    },

    #[error("{0}")]
    Wallet(ProviderRpcError),

    #[error("{0}")]
    Rpc(ProviderRpcError),

    #[error("Wallet returned an invalid transaction hash: {0}")]
    InvalidTransactionHash(String),
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => DispatchError::UnknownContract(name),
            other => DispatchError::Registry(other),
        }
    }
}

impl DispatchError {
    /// Structured provider code, when the failure came straight from the
    /// wallet or RPC endpoint.
    ///
    /// Reconciler failures carry no code; their messages classify as network
    /// problems.
    pub fn provider_code(&self) -> Option<i64> {
        match self {
            DispatchError::Wallet(e) | DispatchError::Rpc(e) => e.code,
            _ => None,
        }
    }

    /// True when no network request was made before the failure.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownContract(_)
                | DispatchError::Registry(_)
                | DispatchError::FunctionNotFound { .. }
                | DispatchError::AbiEncoding { .. }
                | DispatchError::WalletUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_guidance_depends_on_device() {
        let mobile = DeviceClass::from_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15",
        );
        let android = DeviceClass::from_user_agent("Mozilla/5.0 (Linux; ANDROID 14; Pixel 8)");
        let desktop = DeviceClass::from_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0",
        );
        assert_eq!(mobile, DeviceClass::Mobile);
        assert_eq!(android, DeviceClass::Mobile);
        assert_eq!(desktop, DeviceClass::Desktop);

        let msg = DispatchError::WalletUnavailable(mobile).to_string();
        assert!(msg.starts_with("No wallet provider found."));
        assert!(msg.contains("MetaMask Mobile"));

        let msg = DispatchError::WalletUnavailable(desktop).to_string();
        assert!(msg.contains("browser extension"));
    }

    #[test]
    fn registry_not_found_maps_to_unknown_contract() {
        let err: DispatchError = RegistryError::NotFound("hub".to_string()).into();
        assert!(matches!(err, DispatchError::UnknownContract(ref n) if n == "hub"));
        assert!(err.is_local());
    }

    #[test]
    fn only_provider_failures_carry_codes() {
        let rejected = DispatchError::Wallet(ProviderRpcError::new(
            USER_REJECTED_REQUEST,
            "User rejected the request.",
        ));
        assert_eq!(rejected.provider_code(), Some(USER_REJECTED_REQUEST));

        let declined = DispatchError::ChainSwitchDeclined {
            chain_name: "Base Sepolia".to_string(),
        };
        assert_eq!(declined.provider_code(), None);
    }
}
