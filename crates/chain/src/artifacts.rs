//! Compiled contract artifacts.
//!
//! Creation bytecode is read from the JSON files the Solidity toolchain
//! emits, one file per contract: `<dir>/<Contract>.json`. Both layouts in
//! common use are accepted:
//!
//! ```text
//! Truffle:  { "bytecode": "0x6080..." }
//! Foundry:  { "bytecode": { "object": "0x6080..." } }
//! ```

use alloy::primitives::Bytes;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    #[serde(rename = "contractName", default)]
    contract_name: Option<String>,
    bytecode: BytecodeField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(String),
    Object { object: String },
}

impl BytecodeField {
    fn as_hex(&self) -> &str {
        match self {
            BytecodeField::Hex(s) => s,
            BytecodeField::Object { object } => object,
        }
    }
}

/// Directory of compiled artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Artifacts directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `contract`.
    pub fn path_of(&self, contract: &str) -> PathBuf {
        self.dir.join(format!("{}.json", contract))
    }

    /// Load creation bytecode for `contract`.
    ///
    /// Interfaces and abstract contracts compile to empty bytecode and
    /// contracts with unlinked libraries contain `__` placeholders; both are
    /// rejected since neither can be deployed as-is.
    pub fn bytecode(&self, contract: &str) -> Result<Bytes> {
        let path = self.path_of(contract);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let artifact: ArtifactFile = serde_json::from_str(&content)
            .with_context(|| format!("Malformed artifact {}", path.display()))?;

        if let Some(name) = &artifact.contract_name {
            if name != contract {
                tracing::warn!(
                    file = %path.display(),
                    contract_name = %name,
                    expected = contract,
                    "Artifact contractName differs from file name"
                );
            }
        }

        let code = artifact.bytecode.as_hex().trim_start_matches("0x");
        if code.is_empty() {
            anyhow::bail!("Artifact {} has no creation bytecode", contract);
        }
        if code.contains("__") {
            anyhow::bail!("Artifact {} has unlinked library references", contract);
        }

        let bytes = hex::decode(code)
            .with_context(|| format!("Artifact {} bytecode is not valid hex", contract))?;
        Ok(Bytes::from(bytes))
    }
}
