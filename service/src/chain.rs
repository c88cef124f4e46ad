use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const RPC_URL_ENV: &str = "BASE_SEPOLIA_RPC_URL";

const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;
const BASE_SEPOLIA_RPC_URL: &str = "https://sepolia.base.org";
const BASE_SEPOLIA_EXPLORER_URL: &str = "https://sepolia.basescan.org";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// The network every write is reconciled against.
///
/// Only the RPC URL can be overridden at runtime; the chain id is fixed so the
/// wallet is never steered to a network the contracts were not deployed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetChain {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub native_currency: NativeCurrency,
    pub block_explorer_url: String,
}

impl TargetChain {
    pub fn base_sepolia() -> Self {
        Self {
            chain_id: BASE_SEPOLIA_CHAIN_ID,
            name: "Base Sepolia".to_string(),
            rpc_url: BASE_SEPOLIA_RPC_URL.to_string(),
            native_currency: NativeCurrency {
                name: "Ether".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            block_explorer_url: BASE_SEPOLIA_EXPLORER_URL.to_string(),
        }
    }

    /// Base Sepolia with the RPC URL taken from `BASE_SEPOLIA_RPC_URL` when set.
    pub fn from_env() -> Self {
        Self::base_sepolia().with_rpc_override(std::env::var(RPC_URL_ENV).ok())
    }

    pub fn with_rpc_override(mut self, rpc_url: Option<String>) -> Self {
        if let Some(url) = rpc_url.filter(|url| !url.trim().is_empty()) {
            self.rpc_url = url;
        }
        self
    }

    /// `0x`-prefixed lowercase hex, as EIP-1193 wallets expect it.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn switch_params(&self) -> Value {
        json!([{ "chainId": self.chain_id_hex() }])
    }

    /// EIP-3085 `wallet_addEthereumChain` parameters for this chain.
    pub fn add_chain_params(&self) -> Value {
        json!([{
            "chainId": self.chain_id_hex(),
            "chainName": self.name,
            "nativeCurrency": self.native_currency,
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": [self.block_explorer_url],
        }])
    }

    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.block_explorer_url.trim_end_matches('/'), tx_hash)
    }
}

impl Default for TargetChain {
    fn default() -> Self {
        Self::base_sepolia()
    }
}

/// Parses a chain id reported by a wallet. Strings are hex quantities, with
/// or without the `0x` prefix; a bare JSON number is taken as is.
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let hex = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            u64::from_str_radix(hex, 16).ok()
        }
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
