#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};

use crate::error::IrError;
use crate::ir::{IrModule, SCHEMA_VERSION};

/// sha-256 hex digest of a unit's source text. Together with the schema
/// version this keys the build cache: identical source + schema means the
/// cached IR is valid.
pub fn source_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Serialize a module to its persisted form. The encoding is field-tagged
/// and self-describing (JSON), so adding an instruction kind later cannot
/// silently corrupt old artifacts — old readers fail loudly on the unknown
/// tag instead.
///
/// Emission is deterministic: struct fields serialize in declaration order
/// and every sequence in the module is order-stable, so identical modules
/// produce identical bytes.
pub fn to_bytes(module: &IrModule) -> Result<Vec<u8>, IrError> {
    // A module that cannot serialize is an internal invariant break, not a
    // bad artifact.
    serde_json::to_vec(module)
        .map_err(|e| IrError::integrity(format!("module failed to serialize: {e}"), None))
}

/// Deserialize a persisted module. Any failure — malformed input, unknown
/// tag, wrong schema version — is a hard `IrDeserializeError`; there is no
/// partial load.
pub fn from_bytes(bytes: &[u8]) -> Result<IrModule, IrError> {
    let module: IrModule = serde_json::from_slice(bytes).map_err(|e| IrError::Deserialize {
        detail: e.to_string(),
    })?;

    if module.schema_version != SCHEMA_VERSION {
        return Err(IrError::Deserialize {
            detail: format!(
                "schema version mismatch: artifact is v{}, compiler expects v{}",
                module.schema_version, SCHEMA_VERSION
            ),
        });
    }

    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_hash_is_stable() {
        let a = source_hash("declare variable x as Integer with value 5");
        let b = source_hash("declare variable x as Integer with value 5");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, source_hash("declare variable x as Integer with value 6"));
    }
}
