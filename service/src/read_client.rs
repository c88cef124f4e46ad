use std::sync::Arc;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes},
    providers::{Provider, RootProvider},
    rpc::types::TransactionRequest,
    transports::http::{reqwest::Url, Client, Http},
};
use async_trait::async_trait;

use crate::{chain::TargetChain, error::ProviderRpcError};

/// Non-mutating calls against the target chain. Never involves the wallet.
#[async_trait]
pub trait ReadTransport: Send + Sync {
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ProviderRpcError>;
}

#[async_trait]
impl<R: ReadTransport + ?Sized> ReadTransport for Arc<R> {
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ProviderRpcError> {
        (**self).call(to, calldata).await
    }
}

/// `eth_call` over HTTP against the chain's public RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcReadClient {
    provider: RootProvider<Http<Client>>,
    rpc_url: Url,
}

impl RpcReadClient {
    pub fn new(chain: &TargetChain) -> Result<Self, ProviderRpcError> {
        let rpc_url: Url = chain.rpc_url.parse().map_err(|e| {
            ProviderRpcError::message(format!("Invalid RPC URL {}: {}", chain.rpc_url, e))
        })?;
        Ok(Self {
            provider: RootProvider::new_http(rpc_url.clone()),
            rpc_url,
        })
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }
}

#[async_trait]
impl ReadTransport for RpcReadClient {
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ProviderRpcError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);
        self.provider.call(&tx).await.map_err(ProviderRpcError::from)
    }
}
