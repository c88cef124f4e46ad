//! Logical contract name -> ABI and deployed address.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use alloy::{json_abi::JsonAbi, primitives::Address};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bindings::ContractName;

const DEFAULT_SAMPLE_PROVENANCE: Address =
    alloy::primitives::address!("97212557fdfffd409e39ef5a9fb6bbb8c372ab99");
const DEFAULT_EXPERIMENTAL_DATA_AUDIT: Address =
    alloy::primitives::address!("d4c1c9e965dc6bcf2d398840c70acb34e940b978");
const DEFAULT_ACCESS_CONTROL: Address =
    alloy::primitives::address!("d98078eb6de460d5883566f1fe4ae43fe89ae77b");
const DEFAULT_WORKFLOW_AUTOMATION: Address =
    alloy::primitives::address!("2a7ec664a8d61cdb49f1b9de2b19a9517e68b62a");
const DEFAULT_INTELLECTUAL_PROPERTY: Address =
    alloy::primitives::address!("acc3012caa93ec7141535f28aab4aa9a47b30edd");

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Contract \"{0}\" is not registered")]
    NotFound(String),

    #[error("Invalid ABI for {contract}: {source}")]
    InvalidAbi {
        contract: ContractName,
        #[source]
        source: serde_json::Error,
    },
}

/// Deployed addresses, keyed the same way the deploy script writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAddresses {
    pub sample_provenance: Address,
    pub experimental_data_audit: Address,
    pub access_control: Address,
    pub workflow_automation: Address,
    pub intellectual_property: Address,
}

/// A deployment artifact may cover only the contracts that deployed
/// successfully; missing entries keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialContractAddresses {
    sample_provenance: Option<Address>,
    experimental_data_audit: Option<Address>,
    access_control: Option<Address>,
    workflow_automation: Option<Address>,
    intellectual_property: Option<Address>,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            sample_provenance: DEFAULT_SAMPLE_PROVENANCE,
            experimental_data_audit: DEFAULT_EXPERIMENTAL_DATA_AUDIT,
            access_control: DEFAULT_ACCESS_CONTROL,
            workflow_automation: DEFAULT_WORKFLOW_AUTOMATION,
            intellectual_property: DEFAULT_INTELLECTUAL_PROPERTY,
        }
    }
}

impl ContractAddresses {
    pub fn get(&self, name: ContractName) -> Address {
        match name {
            ContractName::SampleProvenance => self.sample_provenance,
            ContractName::ExperimentalDataAudit => self.experimental_data_audit,
            ContractName::AccessControl => self.access_control,
            ContractName::WorkflowAutomation => self.workflow_automation,
            ContractName::IntellectualProperty => self.intellectual_property,
        }
    }

    /// Overlays a (possibly partial) `contract-addresses.json` document on the
    /// defaults.
    pub fn from_json_over_defaults(json: &str) -> Result<Self, serde_json::Error> {
        let overrides: PartialContractAddresses = serde_json::from_str(json)?;
        let defaults = Self::default();
        Ok(Self {
            sample_provenance: overrides
                .sample_provenance
                .unwrap_or(defaults.sample_provenance),
            experimental_data_audit: overrides
                .experimental_data_audit
                .unwrap_or(defaults.experimental_data_audit),
            access_control: overrides.access_control.unwrap_or(defaults.access_control),
            workflow_automation: overrides
                .workflow_automation
                .unwrap_or(defaults.workflow_automation),
            intellectual_property: overrides
                .intellectual_property
                .unwrap_or(defaults.intellectual_property),
        })
    }

    /// Loads the deploy output at `path`. A missing or malformed file is not an
    /// error: the defaults are kept and a warning is logged.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(
                    "Could not load contract addresses from {}, using default addresses: {}",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        match Self::from_json_over_defaults(&contents) {
            Ok(addresses) => {
                tracing::info!("Loaded contract addresses from {}", path.display());
                addresses
            }
            Err(e) => {
                tracing::warn!(
                    "Malformed contract addresses in {}, using default addresses: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub name: ContractName,
    pub abi: Arc<JsonAbi>,
    pub address: Address,
}

impl ContractDescriptor {
    pub fn has_function(&self, function: &str) -> bool {
        self.abi.functions.contains_key(function)
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    addresses: ContractAddresses,
    abis: BTreeMap<ContractName, Arc<JsonAbi>>,
}

impl Registry {
    pub fn new(addresses: ContractAddresses) -> Result<Self, RegistryError> {
        let mut abis = BTreeMap::new();
        for name in ContractName::ALL {
            let abi = name
                .parse_abi()
                .map_err(|source| RegistryError::InvalidAbi {
                    contract: name,
                    source,
                })?;
            abis.insert(name, Arc::new(abi));
        }
        Ok(Self { addresses, abis })
    }

    pub fn addresses(&self) -> &ContractAddresses {
        &self.addresses
    }

    pub fn resolve(&self, name: &str) -> Result<ContractDescriptor, RegistryError> {
        let contract = name
            .parse::<ContractName>()
            .map_err(|_| RegistryError::NotFound(name.to_string()))?;
        self.descriptor(contract)
    }

    pub fn descriptor(&self, name: ContractName) -> Result<ContractDescriptor, RegistryError> {
        let abi = self
            .abis
            .get(&name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok(ContractDescriptor {
            name,
            abi,
            address: self.addresses.get(name),
        })
    }

    /// Diagnostic only; dispatch never refuses a placeholder address.
    pub fn is_placeholder_address(&self, name: ContractName) -> bool {
        self.addresses.get(name) == ContractAddresses::default().get(name)
    }
}
