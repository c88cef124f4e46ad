//! Contract service for the GENEForge genomics record-keeping platform.
//!
//! Resolves logical contract names against a registry of ABIs and deployed
//! addresses, reads through the chain's public RPC endpoint and submits
//! writes through an EIP-1193 wallet after making sure the wallet is on the
//! target chain.

pub mod bindings;
pub mod calls;
pub mod chain;
pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod read_client;
pub mod reconciler;
pub mod registry;
pub mod research;
pub mod wallet;

pub use bindings::ContractName;
pub use calls::{coerce_args, CallRequest};
pub use chain::{NativeCurrency, TargetChain};
pub use classify::{
    classify, handle_transaction_error, report_transaction_error, Classification, ErrorCategory, ErrorHandlerOptions,
    RawError, Toast, ToastVariant, Toaster,
};
pub use dispatcher::Dispatcher;
pub use error::{DeviceClass, DispatchError, ProviderRpcError, Result};
pub use history::{
    HistoryError, MemoryStorage, RedbStorage, Storage, TransactionHistory, TransactionRecord,
};
pub use read_client::{ReadTransport, RpcReadClient};
pub use reconciler::{ReconcileState, Reconciler, Reconciliation};
pub use registry::{ContractAddresses, ContractDescriptor, Registry, RegistryError};
pub use research::{
    EvidenceRecord, ExperimentRecord, ResearchClient, SampleRecord, WorkflowStatus,
};
pub use wallet::{LocalWallet, WalletProvider};
