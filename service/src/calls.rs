use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier},
    json_abi::Function,
    primitives::Bytes,
};

use crate::{
    bindings::ContractName,
    error::{DispatchError, Result},
    registry::ContractDescriptor,
};

/// One contract call, built fresh for each user action.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub contract: String,
    pub function: String,
    pub args: Vec<DynSolValue>,
}

impl CallRequest {
    pub fn new(
        contract: impl Into<String>,
        function: impl Into<String>,
        args: Vec<DynSolValue>,
    ) -> Self {
        Self {
            contract: contract.into(),
            function: function.into(),
            args,
        }
    }
}

/// Picks the ABI entry for `function`, preferring the overload whose arity
/// matches `arg_count`.
pub(crate) fn select_function<'a>(
    descriptor: &'a ContractDescriptor,
    function: &str,
    arg_count: usize,
) -> Result<&'a Function> {
    let overloads = descriptor
        .abi
        .functions
        .get(function)
        .filter(|overloads| !overloads.is_empty())
        .ok_or_else(|| DispatchError::FunctionNotFound {
            contract: descriptor.name,
            function: function.to_string(),
        })?;

    Ok(overloads
        .iter()
        .find(|f| f.inputs.len() == arg_count)
        .unwrap_or(&overloads[0]))
}

pub(crate) fn encode_call(
    contract: ContractName,
    function: &Function,
    args: &[DynSolValue],
) -> Result<Bytes> {
    function
        .abi_encode_input(args)
        .map(Bytes::from)
        .map_err(|e| DispatchError::AbiEncoding {
            contract,
            function: function.name.clone(),
            reason: e.to_string(),
        })
}

pub(crate) fn decode_output(
    contract: ContractName,
    function: &Function,
    data: &[u8],
) -> Result<Vec<DynSolValue>> {
    function
        .abi_decode_output(data, true)
        .map_err(|e| DispatchError::AbiDecoding {
            contract,
            function: function.name.clone(),
            reason: e.to_string(),
        })
}

/// Parses command-line style string arguments against the function's input
/// types.
pub fn coerce_args(
    descriptor: &ContractDescriptor,
    function: &str,
    raw: &[String],
) -> Result<Vec<DynSolValue>> {
    let selected = select_function(descriptor, function, raw.len())?;
    if selected.inputs.len() != raw.len() {
        return Err(DispatchError::AbiEncoding {
            contract: descriptor.name,
            function: function.to_string(),
            reason: format!(
                "expected {} arguments, got {}",
                selected.inputs.len(),
                raw.len()
            ),
        });
    }

    selected
        .inputs
        .iter()
        .zip(raw)
        .map(|(param, value)| {
            let ty = param.resolve().map_err(|e| DispatchError::AbiEncoding {
                contract: descriptor.name,
                function: function.to_string(),
                reason: e.to_string(),
            })?;
            ty.coerce_str(value).map_err(|e| DispatchError::AbiEncoding {
                contract: descriptor.name,
                function: function.to_string(),
                reason: format!("argument {:?}: {}", param.name, e),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;
    use crate::registry::{ContractAddresses, Registry};

    fn descriptor(name: &str) -> ContractDescriptor {
        Registry::new(ContractAddresses::default())
            .unwrap()
            .resolve(name)
            .unwrap()
    }

    #[test]
    fn encodes_with_selector() {
        let samples = descriptor("sampleProvenance");
        let function = select_function(&samples, "getSampleCount", 0).unwrap();
        let data = encode_call(samples.name, function, &[]).unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.as_ref(), function.selector().as_slice());
    }

    #[test]
    fn wrong_arity_fails_to_encode() {
        let samples = descriptor("sampleProvenance");
        let function = select_function(&samples, "getSample", 2).unwrap();
        let err = encode_call(samples.name, function, &[]).unwrap_err();
        assert!(matches!(err, DispatchError::AbiEncoding { .. }));
    }

    #[test]
    fn missing_function_is_reported() {
        let samples = descriptor("sampleProvenance");
        let err = select_function(&samples, "burn", 0).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::FunctionNotFound { function, .. } if function == "burn"
        ));
    }

    #[test]
    fn coerces_string_arguments() {
        let audit = descriptor("experimentalDataAudit");
        let args = coerce_args(
            &audit,
            "registerEvidence",
            &["7".to_string(), "sequence".to_string(), "0xabc".to_string()],
        )
        .unwrap();
        assert_eq!(args[0], DynSolValue::Uint(U256::from(7), 256));
        assert_eq!(args[1], DynSolValue::String("sequence".to_string()));

        let err = coerce_args(&audit, "registerEvidence", &["7".to_string()]).unwrap_err();
        assert!(matches!(err, DispatchError::AbiEncoding { .. }));

        let err = coerce_args(
            &audit,
            "registerEvidence",
            &["seven".to_string(), "a".to_string(), "b".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::AbiEncoding { .. }));
    }

    #[test]
    fn decodes_outputs() {
        let samples = descriptor("sampleProvenance");
        let function = select_function(&samples, "getSampleCount", 0).unwrap();
        let data = DynSolValue::Uint(U256::from(3), 256).abi_encode();
        let out = decode_output(samples.name, function, &data).unwrap();
        assert_eq!(out, vec![DynSolValue::Uint(U256::from(3), 256)]);
    }
}
