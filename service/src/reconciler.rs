//! Aligns the wallet's selected chain with the target chain before a write.
//!
//! ```text
//! Unknown -> Checking -> Matched
//!                     -> Mismatched -> Switching -> Matched
//!                                               -> Added -> Matched | Failed
//!                                               -> Failed
//! ```
//!
//! One attempt per write. A failed switch or add fails the write; the caller
//! retries by issuing a new write.

use std::fmt;

use crate::{
    chain::{parse_chain_id, TargetChain},
    error::{DispatchError, Result, UNRECOGNIZED_CHAIN, USER_REJECTED_REQUEST},
    wallet::{
        WalletProvider, ETH_CHAIN_ID, WALLET_ADD_ETHEREUM_CHAIN, WALLET_SWITCH_ETHEREUM_CHAIN,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Unknown,
    Checking,
    Matched,
    Mismatched,
    Switching,
    Added,
    Failed,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcileState::Unknown => "unknown",
            ReconcileState::Checking => "checking",
            ReconcileState::Matched => "matched",
            ReconcileState::Mismatched => "mismatched",
            ReconcileState::Switching => "switching",
            ReconcileState::Added => "added",
            ReconcileState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Chain the wallet reported before any switch.
    pub wallet_chain_id: u64,
    /// Every state visited, starting at `Unknown` and ending at `Matched`.
    pub path: Vec<ReconcileState>,
}

impl Reconciliation {
    pub fn was_switched(&self) -> bool {
        self.path.contains(&ReconcileState::Switching)
    }

    pub fn was_added(&self) -> bool {
        self.path.contains(&ReconcileState::Added)
    }
}

pub struct Reconciler<'a, W: ?Sized> {
    wallet: &'a W,
    chain: &'a TargetChain,
    path: Vec<ReconcileState>,
}

impl<'a, W> Reconciler<'a, W>
where
    W: WalletProvider + ?Sized,
{
    pub fn new(wallet: &'a W, chain: &'a TargetChain) -> Self {
        Self {
            wallet,
            chain,
            path: vec![ReconcileState::Unknown],
        }
    }

    pub fn state(&self) -> ReconcileState {
        self.path.last().copied().unwrap_or(ReconcileState::Unknown)
    }

    fn transition(&mut self, next: ReconcileState) {
        tracing::debug!("Chain reconciliation: {} -> {}", self.state(), next);
        self.path.push(next);
    }

    fn fail(&mut self, err: DispatchError) -> DispatchError {
        self.transition(ReconcileState::Failed);
        tracing::error!("Chain reconciliation failed: {}", err);
        err
    }

    pub async fn ensure_chain(mut self) -> Result<Reconciliation> {
        self.transition(ReconcileState::Checking);
        let reported = match self
            .wallet
            .request(ETH_CHAIN_ID, serde_json::json!([]))
            .await
        {
            Ok(value) => value,
            Err(e) => return Err(self.fail(DispatchError::ChainQuery(e))),
        };
        let wallet_chain_id = match parse_chain_id(&reported) {
            Some(id) => id,
            None => return Err(self.fail(DispatchError::InvalidChainId(reported.to_string()))),
        };

        tracing::info!(
            "Current wallet chain: {}, Target chain: {}",
            wallet_chain_id,
            self.chain.chain_id
        );

        if wallet_chain_id != self.chain.chain_id {
            self.transition(ReconcileState::Mismatched);
            self.switch(wallet_chain_id).await?;
        }

        self.transition(ReconcileState::Matched);
        Ok(Reconciliation {
            wallet_chain_id,
            path: self.path,
        })
    }

    async fn switch(&mut self, from: u64) -> Result<()> {
        tracing::info!(
            "Switching chain from {} to {} ({})",
            from,
            self.chain.chain_id,
            self.chain.name
        );
        self.transition(ReconcileState::Switching);

        let err = match self
            .wallet
            .request(WALLET_SWITCH_ETHEREUM_CHAIN, self.chain.switch_params())
            .await
        {
            Ok(_) => {
                tracing::info!("Successfully switched to {}", self.chain.name);
                return Ok(());
            }
            Err(e) => e,
        };

        tracing::warn!("Error switching chain: {}", err);
        match err.code {
            Some(UNRECOGNIZED_CHAIN) => self.add().await,
            Some(USER_REJECTED_REQUEST) => Err(self.fail(DispatchError::ChainSwitchDeclined {
                chain_name: self.chain.name.clone(),
            })),
            _ => Err(self.fail(DispatchError::ChainSwitchFailed {
                chain_name: self.chain.name.clone(),
                source: err,
            })),
        }
    }

    async fn add(&mut self) -> Result<()> {
        tracing::info!(
            "{} is unknown to the wallet, requesting it be added",
            self.chain.name
        );
        match self
            .wallet
            .request(WALLET_ADD_ETHEREUM_CHAIN, self.chain.add_chain_params())
            .await
        {
            Ok(_) => {
                self.transition(ReconcileState::Added);
                Ok(())
            }
            Err(source) => Err(self.fail(DispatchError::ChainAddFailed {
                chain_name: self.chain.name.clone(),
                chain_id: self.chain.chain_id,
                source,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::error::ProviderRpcError;

    /// Wallet that replays scripted responses per method and records calls.
    struct ScriptedWallet {
        chain_id: &'static str,
        switch: Option<ProviderRpcError>,
        add: Option<ProviderRpcError>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedWallet {
        fn on(chain_id: &'static str) -> Self {
            Self {
                chain_id,
                switch: None,
                add: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn methods(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(m, _)| m.clone())
                .collect()
        }
    }

    #[async_trait]
    impl WalletProvider for ScriptedWallet {
        async fn request(
            &self,
            method: &str,
            params: Value,
        ) -> std::result::Result<Value, ProviderRpcError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params));
            let scripted = match method {
                ETH_CHAIN_ID => return Ok(json!(self.chain_id)),
                WALLET_SWITCH_ETHEREUM_CHAIN => &self.switch,
                WALLET_ADD_ETHEREUM_CHAIN => &self.add,
                _ => unreachable!("unexpected method {method}"),
            };
            match scripted {
                Some(err) => Err(err.clone()),
                None => Ok(Value::Null),
            }
        }
    }

    #[tokio::test]
    async fn matching_chain_needs_no_switch() {
        let chain = TargetChain::base_sepolia();
        let wallet = ScriptedWallet::on("0x14a34");
        let outcome = Reconciler::new(&wallet, &chain)
            .ensure_chain()
            .await
            .unwrap();

        assert_eq!(
            outcome.path,
            vec![
                ReconcileState::Unknown,
                ReconcileState::Checking,
                ReconcileState::Matched
            ]
        );
        assert_eq!(wallet.methods(), vec![ETH_CHAIN_ID]);
    }

    #[tokio::test]
    async fn unprefixed_hex_chain_id_matches() {
        let chain = TargetChain::base_sepolia();
        let wallet = ScriptedWallet::on("14a34");
        let outcome = Reconciler::new(&wallet, &chain)
            .ensure_chain()
            .await
            .unwrap();

        assert_eq!(outcome.wallet_chain_id, 84532);
        assert!(!outcome.was_switched());
        assert_eq!(wallet.methods(), vec![ETH_CHAIN_ID]);
    }

    #[tokio::test]
    async fn mismatched_chain_is_switched() {
        let chain = TargetChain::base_sepolia();
        let wallet = ScriptedWallet::on("0x1");
        let outcome = Reconciler::new(&wallet, &chain)
            .ensure_chain()
            .await
            .unwrap();

        assert_eq!(outcome.wallet_chain_id, 1);
        assert!(outcome.was_switched());
        assert!(!outcome.was_added());
        assert_eq!(
            wallet.methods(),
            vec![ETH_CHAIN_ID, WALLET_SWITCH_ETHEREUM_CHAIN]
        );
        let calls = wallet.calls.lock().unwrap();
        assert_eq!(calls[1].1, json!([{ "chainId": "0x14a34" }]));
    }

    #[tokio::test]
    async fn unknown_chain_is_added_once() {
        let chain = TargetChain::base_sepolia();
        let mut wallet = ScriptedWallet::on("0x1");
        wallet.switch = Some(ProviderRpcError::new(
            UNRECOGNIZED_CHAIN,
            "Unrecognized chain",
        ));
        let outcome = Reconciler::new(&wallet, &chain)
            .ensure_chain()
            .await
            .unwrap();

        assert_eq!(
            outcome.path,
            vec![
                ReconcileState::Unknown,
                ReconcileState::Checking,
                ReconcileState::Mismatched,
                ReconcileState::Switching,
                ReconcileState::Added,
                ReconcileState::Matched,
            ]
        );
        assert_eq!(
            wallet.methods(),
            vec![
                ETH_CHAIN_ID,
                WALLET_SWITCH_ETHEREUM_CHAIN,
                WALLET_ADD_ETHEREUM_CHAIN
            ]
        );
        let calls = wallet.calls.lock().unwrap();
        assert_eq!(calls[2].1, chain.add_chain_params());
    }

    #[tokio::test]
    async fn failed_add_reports_chain_id() {
        let chain = TargetChain::base_sepolia();
        let mut wallet = ScriptedWallet::on("0x1");
        wallet.switch = Some(ProviderRpcError::new(
            UNRECOGNIZED_CHAIN,
            "Unrecognized chain",
        ));
        wallet.add = Some(ProviderRpcError::new(-32603, "add failed"));
        let err = Reconciler::new(&wallet, &chain)
            .ensure_chain()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::ChainAddFailed {
                chain_id: 84532,
                ..
            }
        ));
        assert!(err.to_string().contains("Chain ID: 84532"));
    }

    #[tokio::test]
    async fn declined_switch_asks_for_approval() {
        let chain = TargetChain::base_sepolia();
        let mut wallet = ScriptedWallet::on("0x2105");
        wallet.switch = Some(ProviderRpcError::new(
            USER_REJECTED_REQUEST,
            "User rejected",
        ));
        let err = Reconciler::new(&wallet, &chain)
            .ensure_chain()
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ChainSwitchDeclined { .. }));
        assert_eq!(
            err.to_string(),
            "Please approve switching to the Base Sepolia network in your wallet to proceed."
        );
        assert_eq!(
            wallet.methods(),
            vec![ETH_CHAIN_ID, WALLET_SWITCH_ETHEREUM_CHAIN]
        );
    }

    #[tokio::test]
    async fn other_switch_failures_ask_for_manual_switch() {
        let chain = TargetChain::base_sepolia();
        let mut wallet = ScriptedWallet::on("0x1");
        wallet.switch = Some(ProviderRpcError::message("request already pending"));
        let err = Reconciler::new(&wallet, &chain)
            .ensure_chain()
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ChainSwitchFailed { .. }));
        assert!(err.to_string().contains("switch networks manually"));
    }

    #[tokio::test]
    async fn unparseable_chain_id_fails() {
        let chain = TargetChain::base_sepolia();
        let wallet = ScriptedWallet::on("base");
        let err = Reconciler::new(&wallet, &chain)
            .ensure_chain()
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidChainId(_)));
    }
}
