use std::{collections::BTreeMap, sync::Mutex};

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use super::{
    WalletProvider, ETH_ACCOUNTS, ETH_CHAIN_ID, ETH_REQUEST_ACCOUNTS, ETH_SEND_TRANSACTION,
    WALLET_ADD_ETHEREUM_CHAIN, WALLET_SWITCH_ETHEREUM_CHAIN,
};
use crate::{
    chain::parse_chain_id,
    error::{
        ProviderRpcError, INTERNAL_ERROR, INVALID_PARAMS, UNAUTHORIZED, UNRECOGNIZED_CHAIN,
        UNSUPPORTED_METHOD,
    },
};

#[derive(Debug)]
struct LocalWalletState {
    current_chain: u64,
    /// chain id -> RPC URL
    chains: BTreeMap<u64, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwitchChainParams {
    chain_id: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddChainParams {
    chain_id: Value,
    #[serde(default)]
    chain_name: Option<String>,
    #[serde(default)]
    rpc_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SendTransactionParams {
    from: Address,
    #[serde(default)]
    to: Option<Address>,
    #[serde(default)]
    data: Option<Bytes>,
    #[serde(default)]
    value: Option<U256>,
}

/// EIP-1193 provider backed by a local private key.
///
/// Behaves like a browser wallet that already trusts the site: it knows a set
/// of chains, switches between them, answers `4902` for chains it has not
/// been told about and signs every transaction from its single account.
#[derive(Debug)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
    state: Mutex<LocalWalletState>,
}

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        let mut chains = BTreeMap::new();
        chains.insert(chain_id, rpc_url.into());
        Self {
            signer,
            state: Mutex::new(LocalWalletState {
                current_chain: chain_id,
                chains,
            }),
        }
    }

    pub fn from_private_key(
        private_key: &str,
        chain_id: u64,
        rpc_url: impl Into<String>,
    ) -> Result<Self, ProviderRpcError> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| ProviderRpcError::message(format!("Invalid private key: {e}")))?;
        Ok(Self::new(signer, chain_id, rpc_url))
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn current_chain_id(&self) -> Result<u64, ProviderRpcError> {
        Ok(self.lock()?.current_chain)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LocalWalletState>, ProviderRpcError> {
        self.state
            .lock()
            .map_err(|e| ProviderRpcError::new(INTERNAL_ERROR, format!("wallet lock poisoned: {e}")))
    }

    fn switch_chain(&self, params: Value) -> Result<Value, ProviderRpcError> {
        let params: SwitchChainParams = first_param(params)?;
        let chain_id = chain_id_param(&params.chain_id)?;

        let mut state = self.lock()?;
        if !state.chains.contains_key(&chain_id) {
            return Err(ProviderRpcError::new(
                UNRECOGNIZED_CHAIN,
                format!("Unrecognized chain ID \"{:#x}\". Try adding the chain using wallet_addEthereumChain first.", chain_id),
            ));
        }
        state.current_chain = chain_id;
        tracing::debug!("Local wallet switched to chain {}", chain_id);
        Ok(Value::Null)
    }

    fn add_chain(&self, params: Value) -> Result<Value, ProviderRpcError> {
        let params: AddChainParams = first_param(params)?;
        let chain_id = chain_id_param(&params.chain_id)?;
        let rpc_url = params
            .rpc_urls
            .into_iter()
            .next()
            .ok_or_else(|| ProviderRpcError::new(INVALID_PARAMS, "rpcUrls must not be empty"))?;

        let mut state = self.lock()?;
        state.chains.insert(chain_id, rpc_url);
        // Wallets switch to a freshly added chain once the user approves it.
        state.current_chain = chain_id;
        tracing::debug!(
            "Local wallet added chain {} ({})",
            chain_id,
            params.chain_name.as_deref().unwrap_or("unnamed")
        );
        Ok(Value::Null)
    }

    async fn send_transaction(&self, params: Value) -> Result<Value, ProviderRpcError> {
        let params: SendTransactionParams = first_param(params)?;
        if params.from != self.address() {
            return Err(ProviderRpcError::new(
                UNAUTHORIZED,
                format!("The requested account {} has not been authorized", params.from),
            ));
        }

        let rpc_url = {
            let state = self.lock()?;
            state
                .chains
                .get(&state.current_chain)
                .cloned()
                .ok_or_else(|| ProviderRpcError::new(INTERNAL_ERROR, "no RPC URL for current chain"))?
        };
        let url: Url = rpc_url.parse().map_err(|e| {
            ProviderRpcError::new(INTERNAL_ERROR, format!("invalid RPC URL {rpc_url}: {e}"))
        })?;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .on_http(url);

        let mut tx = TransactionRequest::default()
            .with_from(params.from)
            .with_input(params.data.unwrap_or_default());
        if let Some(to) = params.to {
            tx = tx.with_to(to);
        }
        if let Some(value) = params.value {
            tx = tx.with_value(value);
        }

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(ProviderRpcError::from)?;
        Ok(json!(pending.tx_hash()))
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        match method {
            ETH_CHAIN_ID => Ok(json!(format!("{:#x}", self.current_chain_id()?))),
            ETH_ACCOUNTS | ETH_REQUEST_ACCOUNTS => Ok(json!([self.address()])),
            WALLET_SWITCH_ETHEREUM_CHAIN => self.switch_chain(params),
            WALLET_ADD_ETHEREUM_CHAIN => self.add_chain(params),
            ETH_SEND_TRANSACTION => self.send_transaction(params).await,
            other => Err(ProviderRpcError::new(
                UNSUPPORTED_METHOD,
                format!("The requested method {other} is not supported by this wallet"),
            )),
        }
    }
}

fn first_param<T: DeserializeOwned>(params: Value) -> Result<T, ProviderRpcError> {
    let first = match params {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        _ => {
            return Err(ProviderRpcError::new(
                INVALID_PARAMS,
                "expected a single-element params array",
            ))
        }
    };
    serde_json::from_value(first)
        .map_err(|e| ProviderRpcError::new(INVALID_PARAMS, format!("invalid params: {e}")))
}

fn chain_id_param(value: &Value) -> Result<u64, ProviderRpcError> {
    parse_chain_id(value)
        .ok_or_else(|| ProviderRpcError::new(INVALID_PARAMS, format!("invalid chainId {value}")))
}
