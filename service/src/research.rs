//! Typed research-record operations on top of the dispatcher.

use std::{fmt, str::FromStr};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{keccak256, Address, TxHash, B256, U256},
};
use futures_util::stream::{self, StreamExt};

use crate::{
    bindings::ContractName,
    dispatcher::Dispatcher,
    error::{DispatchError, Result},
    read_client::ReadTransport,
    wallet::WalletProvider,
};

const SAMPLES: &str = "sampleProvenance";
const AUDIT: &str = "experimentalDataAudit";
const ACCESS: &str = "accessControl";
const WORKFLOW: &str = "workflowAutomation";
const IP: &str = "intellectualProperty";

/// Sample reads in flight at once while listing.
pub const SAMPLE_FETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    pub sample_id: String,
    pub sample_type: String,
    pub description: String,
    pub hazard_level: String,
    pub registered_by: Address,
    pub timestamp: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentRecord {
    pub specimen_id: U256,
    pub location: String,
    pub notes: String,
    pub recorded_by: Address,
    pub timestamp: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceRecord {
    pub specimen_id: U256,
    pub evidence_type: String,
    pub evidence_hash: String,
    pub submitted_by: Address,
    pub timestamp: U256,
}

/// Sample lifecycle, in the contract's enum order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkflowStatus {
    Collected = 0,
    Processing = 1,
    Analyzed = 2,
    Published = 3,
    Archived = 4,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 5] = [
        WorkflowStatus::Collected,
        WorkflowStatus::Processing,
        WorkflowStatus::Analyzed,
        WorkflowStatus::Published,
        WorkflowStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Collected => "Collected",
            WorkflowStatus::Processing => "Processing",
            WorkflowStatus::Analyzed => "Analyzed",
            WorkflowStatus::Published => "Published",
            WorkflowStatus::Archived => "Archived",
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        WorkflowStatus::ALL.into_iter().find(|s| *s as u8 == value)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        WorkflowStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("'{}' is not a workflow status", s))
    }
}

/// Role identifiers are the keccak256 of the role name, as in OpenZeppelin's
/// `AccessControl`.
pub fn role_id(role: &str) -> B256 {
    keccak256(role.as_bytes())
}

/// Parses a comma separated owner list. Entries without a `0x` prefix are
/// ignored; prefixed entries must be valid addresses.
pub fn parse_owner_list(owners: &str) -> std::result::Result<Vec<Address>, String> {
    owners
        .split(',')
        .map(str::trim)
        .filter(|entry| entry.starts_with("0x"))
        .map(|entry| {
            entry
                .parse::<Address>()
                .map_err(|e| format!("invalid owner address {entry}: {e}"))
        })
        .collect()
}

/// Sample ids used by the registration form: `SAMPLE001`, `SAMPLE002`, ...
pub fn sample_id(index: u64) -> String {
    format!("SAMPLE{:03}", index)
}

pub struct ResearchClient<R, W> {
    dispatcher: Dispatcher<R, W>,
}

impl<R, W> ResearchClient<R, W>
where
    R: ReadTransport,
    W: WalletProvider,
{
    pub fn new(dispatcher: Dispatcher<R, W>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<R, W> {
        &self.dispatcher
    }

    pub async fn register_genome_sample(
        &self,
        sample_id: &str,
        sample_type: &str,
        description: &str,
        importance: &str,
    ) -> Result<TxHash> {
        self.dispatcher
            .write(
                SAMPLES,
                "registerSample",
                vec![
                    string(sample_id),
                    string(sample_type),
                    string(description),
                    string(importance),
                ],
            )
            .await
    }

    pub async fn get_genome_sample(&self, sample_id: &str) -> Result<SampleRecord> {
        let out = self
            .dispatcher
            .read(SAMPLES, "getSample", vec![string(sample_id)])
            .await?;
        let mut fields = Fields::new(ContractName::SampleProvenance, "getSample", out);
        Ok(SampleRecord {
            sample_id: fields.string()?,
            sample_type: fields.string()?,
            description: fields.string()?,
            hazard_level: fields.string()?,
            registered_by: fields.address()?,
            timestamp: fields.uint()?,
        })
    }

    pub async fn get_genome_sample_count(&self) -> Result<u64> {
        self.count(SAMPLES, ContractName::SampleProvenance, "getSampleCount")
            .await
    }

    /// Fetches `SAMPLE001..SAMPLE{count}` in id order, at most
    /// [`SAMPLE_FETCH_CONCURRENCY`] at a time. A sample that cannot be read is
    /// logged and comes back as `None` instead of failing the whole batch.
    pub async fn fetch_samples(&self, count: u64) -> Vec<Option<SampleRecord>> {
        stream::iter(1..=count)
            .map(|index| async move {
                let id = sample_id(index);
                match self.get_genome_sample(&id).await {
                    Ok(sample) => Some(sample),
                    Err(e) => {
                        tracing::warn!("Error fetching sample {}: {}", id, e);
                        None
                    }
                }
            })
            .buffered(SAMPLE_FETCH_CONCURRENCY)
            .collect()
            .await
    }

    /// Readable samples among the first `count`.
    pub async fn list_samples(&self, count: u64) -> Vec<SampleRecord> {
        self.fetch_samples(count).await.into_iter().flatten().collect()
    }

    pub async fn load_samples(&self) -> Result<Vec<SampleRecord>> {
        let count = self.get_genome_sample_count().await?;
        Ok(self.list_samples(count).await)
    }

    pub async fn register_experiment(
        &self,
        specimen_id: U256,
        location: &str,
        notes: &str,
    ) -> Result<TxHash> {
        self.dispatcher
            .write(
                AUDIT,
                "registerExperiment",
                vec![uint(specimen_id), string(location), string(notes)],
            )
            .await
    }

    pub async fn get_experiment_count(&self) -> Result<u64> {
        self.count(AUDIT, ContractName::ExperimentalDataAudit, "getExperimentCount")
            .await
    }

    pub async fn get_experiment(&self, id: U256) -> Result<ExperimentRecord> {
        let out = self
            .dispatcher
            .read(AUDIT, "getExperiment", vec![uint(id)])
            .await?;
        let mut fields = Fields::new(ContractName::ExperimentalDataAudit, "getExperiment", out);
        Ok(ExperimentRecord {
            specimen_id: fields.uint()?,
            location: fields.string()?,
            notes: fields.string()?,
            recorded_by: fields.address()?,
            timestamp: fields.uint()?,
        })
    }

    pub async fn register_research_evidence(
        &self,
        specimen_id: U256,
        evidence_type: &str,
        evidence_hash: &str,
    ) -> Result<TxHash> {
        self.dispatcher
            .write(
                AUDIT,
                "registerEvidence",
                vec![uint(specimen_id), string(evidence_type), string(evidence_hash)],
            )
            .await
    }

    pub async fn get_research_evidence_count(&self) -> Result<u64> {
        self.count(AUDIT, ContractName::ExperimentalDataAudit, "getEvidenceCount")
            .await
    }

    pub async fn get_research_evidence(&self, id: U256) -> Result<EvidenceRecord> {
        let out = self
            .dispatcher
            .read(AUDIT, "getEvidence", vec![uint(id)])
            .await?;
        let mut fields = Fields::new(ContractName::ExperimentalDataAudit, "getEvidence", out);
        Ok(EvidenceRecord {
            specimen_id: fields.uint()?,
            evidence_type: fields.string()?,
            evidence_hash: fields.string()?,
            submitted_by: fields.address()?,
            timestamp: fields.uint()?,
        })
    }

    pub async fn grant_researcher_access(&self, role: &str, account: Address) -> Result<TxHash> {
        self.dispatcher
            .write(
                ACCESS,
                "grantRole",
                vec![
                    DynSolValue::FixedBytes(role_id(role), 32),
                    DynSolValue::Address(account),
                ],
            )
            .await
    }

    pub async fn update_sample_status(
        &self,
        sample_id: &str,
        status: WorkflowStatus,
        notes: &str,
    ) -> Result<TxHash> {
        self.dispatcher
            .write(
                WORKFLOW,
                "updateSampleStatus",
                vec![
                    string(sample_id),
                    DynSolValue::Uint(U256::from(status as u8), 8),
                    string(notes),
                ],
            )
            .await
    }

    pub async fn register_ip(
        &self,
        title: &str,
        description: &str,
        ip_type: &str,
        uri: Option<&str>,
        initial_owners: &str,
    ) -> Result<TxHash> {
        let owners =
            parse_owner_list(initial_owners).map_err(|reason| DispatchError::AbiEncoding {
                contract: ContractName::IntellectualProperty,
                function: "createIPRecord".to_string(),
                reason,
            })?;
        self.dispatcher
            .write(
                IP,
                "createIPRecord",
                vec![
                    string(title),
                    string(description),
                    string(ip_type),
                    string(uri.unwrap_or_default()),
                    DynSolValue::Array(owners.into_iter().map(DynSolValue::Address).collect()),
                ],
            )
            .await
    }

    async fn count(&self, contract: &str, name: ContractName, function: &str) -> Result<u64> {
        let out = self.dispatcher.read(contract, function, Vec::new()).await?;
        let count = Fields::new(name, function, out).uint()?;
        u64::try_from(count).map_err(|e| DispatchError::AbiDecoding {
            contract: name,
            function: function.to_string(),
            reason: e.to_string(),
        })
    }
}

fn string(value: &str) -> DynSolValue {
    DynSolValue::String(value.to_string())
}

fn uint(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

/// Sequential reader over decoded outputs.
struct Fields {
    contract: ContractName,
    function: String,
    values: std::vec::IntoIter<DynSolValue>,
}

impl Fields {
    fn new(contract: ContractName, function: &str, values: Vec<DynSolValue>) -> Self {
        Self {
            contract,
            function: function.to_string(),
            values: values.into_iter(),
        }
    }

    fn error(&self, reason: &str) -> DispatchError {
        DispatchError::AbiDecoding {
            contract: self.contract,
            function: self.function.clone(),
            reason: reason.to_string(),
        }
    }

    fn next(&mut self) -> Result<DynSolValue> {
        self.values
            .next()
            .ok_or_else(|| self.error("missing output value"))
    }

    fn string(&mut self) -> Result<String> {
        match self.next()? {
            DynSolValue::String(s) => Ok(s),
            _ => Err(self.error("expected string")),
        }
    }

    fn address(&mut self) -> Result<Address> {
        match self.next()? {
            DynSolValue::Address(a) => Ok(a),
            _ => Err(self.error("expected address")),
        }
    }

    fn uint(&mut self) -> Result<U256> {
        match self.next()? {
            DynSolValue::Uint(v, _) => Ok(v),
            _ => Err(self.error("expected uint")),
        }
    }
}
