use std::{fmt, str::FromStr};

use alloy::json_abi::JsonAbi;

const SAMPLE_PROVENANCE_ABI: &str = include_str!("../abis/SampleProvenance.json");
const EXPERIMENTAL_DATA_AUDIT_ABI: &str = include_str!("../abis/ExperimentalDataAudit.json");
const ACCESS_CONTROL_ABI: &str = include_str!("../abis/AccessControl.json");
const WORKFLOW_AUTOMATION_ABI: &str = include_str!("../abis/WorkflowAutomation.json");
const INTELLECTUAL_PROPERTY_ABI: &str = include_str!("../abis/IntellectualProperty.json");

/// The fixed set of contracts the application talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractName {
    SampleProvenance,
    ExperimentalDataAudit,
    AccessControl,
    WorkflowAutomation,
    IntellectualProperty,
}

impl ContractName {
    pub const ALL: [ContractName; 5] = [
        ContractName::SampleProvenance,
        ContractName::ExperimentalDataAudit,
        ContractName::AccessControl,
        ContractName::WorkflowAutomation,
        ContractName::IntellectualProperty,
    ];

    /// Logical name, also the key used in `contract-addresses.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractName::SampleProvenance => "sampleProvenance",
            ContractName::ExperimentalDataAudit => "experimentalDataAudit",
            ContractName::AccessControl => "accessControl",
            ContractName::WorkflowAutomation => "workflowAutomation",
            ContractName::IntellectualProperty => "intellectualProperty",
        }
    }

    /// Solidity contract name, as used for artifact and ABI file names.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ContractName::SampleProvenance => "SampleProvenance",
            ContractName::ExperimentalDataAudit => "ExperimentalDataAudit",
            ContractName::AccessControl => "AccessControl",
            ContractName::WorkflowAutomation => "WorkflowAutomation",
            ContractName::IntellectualProperty => "IntellectualProperty",
        }
    }

    pub(crate) fn abi_json(&self) -> &'static str {
        match self {
            ContractName::SampleProvenance => SAMPLE_PROVENANCE_ABI,
            ContractName::ExperimentalDataAudit => EXPERIMENTAL_DATA_AUDIT_ABI,
            ContractName::AccessControl => ACCESS_CONTROL_ABI,
            ContractName::WorkflowAutomation => WORKFLOW_AUTOMATION_ABI,
            ContractName::IntellectualProperty => INTELLECTUAL_PROPERTY_ABI,
        }
    }

    pub(crate) fn parse_abi(&self) -> Result<JsonAbi, serde_json::Error> {
        serde_json::from_str(self.abi_json())
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractName {
    type Err = String;

    /// Accepts the logical name or the Solidity contract name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractName::ALL
            .into_iter()
            .find(|name| name.as_str() == s || name.artifact_name() == s)
            .ok_or_else(|| format!("'{}' is not a valid contract name", s))
    }
}
