//! EIP-1193 wallet provider seam.
//!
//! The application never holds an authoritative copy of the wallet session:
//! chain and accounts are read through [`WalletProvider::request`] every time
//! they are needed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderRpcError;

mod local;

pub use local::LocalWallet;

pub const ETH_CHAIN_ID: &str = "eth_chainId";
pub const ETH_ACCOUNTS: &str = "eth_accounts";
pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
pub const WALLET_SWITCH_ETHEREUM_CHAIN: &str = "wallet_switchEthereumChain";
pub const WALLET_ADD_ETHEREUM_CHAIN: &str = "wallet_addEthereumChain";

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;
}

#[async_trait]
impl<W: WalletProvider + ?Sized> WalletProvider for Arc<W> {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        (**self).request(method, params).await
    }
}

#[async_trait]
impl<W: WalletProvider + ?Sized> WalletProvider for &W {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        (**self).request(method, params).await
    }
}
