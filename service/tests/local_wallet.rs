//! Local wallet against a throwaway Anvil node. Needs `anvil` on the PATH:
//! `cargo test -- --ignored`.

use alloy::{
    node_bindings::Anvil,
    primitives::{TxHash, U256},
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use serde_json::json;

use geneforge::{LocalWallet, WalletProvider};

#[tokio::test]
#[ignore]
async fn sends_value_transfer_through_eip1193_surface() -> eyre::Result<()> {
    let anvil = Anvil::new().try_spawn()?;
    let alice: PrivateKeySigner = anvil.keys()[0].clone().into();
    let bob: PrivateKeySigner = anvil.keys()[1].clone().into();

    let wallet = LocalWallet::new(alice.clone(), anvil.chain_id(), anvil.endpoint());
    let provider = ProviderBuilder::new().on_http(anvil.endpoint_url());

    let chain_id = wallet.request("eth_chainId", json!([])).await?;
    assert_eq!(chain_id, json!(format!("{:#x}", anvil.chain_id())));

    let before = provider.get_balance(bob.address()).await?;
    let value = U256::from(1_000_000_000_000_000u64);
    let hash = wallet
        .request(
            "eth_sendTransaction",
            json!([{ "from": alice.address(), "to": bob.address(), "value": value }]),
        )
        .await?;
    let hash: TxHash = serde_json::from_value(hash)?;

    let receipt = provider.get_transaction_receipt(hash).await?;
    assert!(receipt.is_some_and(|r| r.status()));
    assert_eq!(provider.get_balance(bob.address()).await?, before + value);

    let err = wallet
        .request(
            "eth_sendTransaction",
            json!([{ "from": bob.address(), "to": alice.address() }]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, Some(4100));

    Ok(())
}
