//! Single entry point for contract reads and writes.

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, TxHash},
};
use serde_json::{json, Value};

use crate::{
    calls::{decode_output, encode_call, select_function, CallRequest},
    chain::TargetChain,
    error::{DeviceClass, DispatchError, Result},
    read_client::ReadTransport,
    reconciler::Reconciler,
    registry::{ContractDescriptor, Registry},
    wallet::{WalletProvider, ETH_ACCOUNTS, ETH_SEND_TRANSACTION},
};

pub struct Dispatcher<R, W> {
    registry: Registry,
    chain: TargetChain,
    reader: R,
    wallet: Option<W>,
    device: DeviceClass,
}

impl<R, W> Dispatcher<R, W>
where
    R: ReadTransport,
    W: WalletProvider,
{
    pub fn new(registry: Registry, chain: TargetChain, reader: R, wallet: Option<W>) -> Self {
        Self {
            registry,
            chain,
            reader,
            wallet,
            device: DeviceClass::Desktop,
        }
    }

    /// Device class used to word the error when no wallet is present.
    pub fn with_device(mut self, device: DeviceClass) -> Self {
        self.device = device;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn chain(&self) -> &TargetChain {
        &self.chain
    }

    fn resolve_checked(&self, contract: &str, function: &str) -> Result<ContractDescriptor> {
        let descriptor = self.registry.resolve(contract)?;
        if !descriptor.has_function(function) {
            tracing::error!(
                "Function \"{}\" not found in {} ABI",
                function,
                descriptor.name
            );
            return Err(DispatchError::FunctionNotFound {
                contract: descriptor.name,
                function: function.to_string(),
            });
        }
        if self.registry.is_placeholder_address(descriptor.name) {
            tracing::warn!(
                "Using placeholder address for {}. Make sure the contract is properly deployed.",
                descriptor.name
            );
        }
        Ok(descriptor)
    }

    pub async fn read(
        &self,
        contract: &str,
        function: &str,
        args: Vec<DynSolValue>,
    ) -> Result<Vec<DynSolValue>> {
        let descriptor = self.resolve_checked(contract, function)?;
        let selected = select_function(&descriptor, function, args.len())?;
        let calldata = encode_call(descriptor.name, selected, &args)?;

        tracing::debug!("Reading from {}.{} with args: {:?}", descriptor.name, function, args);
        let output = self
            .reader
            .call(descriptor.address, calldata)
            .await
            .map_err(|e| {
                tracing::error!("Error reading from {}.{}: {}", descriptor.name, function, e);
                DispatchError::Rpc(e)
            })?;

        decode_output(descriptor.name, selected, &output)
    }

    /// Submits a transaction through the wallet and returns its hash as soon as
    /// the wallet accepts it. Confirmation is left to the caller.
    pub async fn write(
        &self,
        contract: &str,
        function: &str,
        args: Vec<DynSolValue>,
    ) -> Result<TxHash> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or(DispatchError::WalletUnavailable(self.device))?;

        let descriptor = self.resolve_checked(contract, function)?;
        let selected = select_function(&descriptor, function, args.len())?;
        let calldata = encode_call(descriptor.name, selected, &args)?;

        Reconciler::new(wallet, &self.chain).ensure_chain().await?;
        let account = active_account(wallet).await?;

        tracing::debug!("Writing to {}.{} with args: {:?}", descriptor.name, function, args);
        let response = wallet
            .request(
                ETH_SEND_TRANSACTION,
                json!([{
                    "from": account,
                    "to": descriptor.address,
                    "data": calldata,
                }]),
            )
            .await
            .map_err(|e| {
                tracing::error!("Error writing to {}.{}: {}", descriptor.name, function, e);
                DispatchError::Wallet(e)
            })?;

        let hash = parse_tx_hash(&response)?;
        tracing::info!(
            "Submitted {}.{} from {}: {}",
            descriptor.name,
            function,
            account,
            hash
        );
        Ok(hash)
    }

    pub async fn read_request(&self, request: CallRequest) -> Result<Vec<DynSolValue>> {
        self.read(&request.contract, &request.function, request.args)
            .await
    }

    pub async fn write_request(&self, request: CallRequest) -> Result<TxHash> {
        self.write(&request.contract, &request.function, request.args)
            .await
    }
}

async fn active_account<W: WalletProvider + ?Sized>(wallet: &W) -> Result<Address> {
    let accounts = wallet
        .request(ETH_ACCOUNTS, json!([]))
        .await
        .map_err(DispatchError::AccountAccess)?;

    let accounts: Vec<Address> = serde_json::from_value(accounts).map_err(|e| {
        DispatchError::AccountAccess(crate::error::ProviderRpcError::message(format!(
            "malformed account list: {e}"
        )))
    })?;

    accounts.into_iter().next().ok_or(DispatchError::NoAccount)
}

fn parse_tx_hash(value: &Value) -> Result<TxHash> {
    value
        .as_str()
        .and_then(|s| s.parse::<TxHash>().ok())
        .ok_or_else(|| DispatchError::InvalidTransactionHash(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transaction_hashes() {
        let hash = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
        assert_eq!(
            parse_tx_hash(&json!(hash)).unwrap(),
            hash.parse::<TxHash>().unwrap()
        );
        assert!(matches!(
            parse_tx_hash(&json!("0x1234")),
            Err(DispatchError::InvalidTransactionHash(_))
        ));
        assert!(parse_tx_hash(&Value::Null).is_err());
    }
}
