//! Deployment manifest: logical component name -> deployed address.
//!
//! Entries keep insertion order so the written file reads in deployment
//! order and diffs cleanly between runs. A name is recorded once; recording
//! it again with the same address is a no-op, with a different one an error.

use alloy::primitives::Address;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::DeployError;

/// Append-only, insertion-ordered name -> address map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentManifest {
    entries: Vec<(String, Address)>,
}

impl DeploymentManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deployed component.
    pub fn record(&mut self, name: &str, address: Address) -> Result<(), DeployError> {
        match self.get(name) {
            Some(existing) if existing == address => Ok(()),
            Some(existing) => Err(DeployError::ManifestConflict {
                name: name.to_string(),
                existing: existing.to_string(),
                attempted: address.to_string(),
            }),
            None => {
                debug!(component = name, address = %address, "Manifest entry recorded");
                self.entries.push((name.to_string(), address));
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, address)| *address)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.entries.iter().map(|(name, address)| (name.as_str(), *address))
    }

    /// Names from `expected` that have no entry.
    pub fn missing<'a>(&self, expected: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        expected
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Serialize to pretty JSON and replace `path` atomically: the content
    /// goes to a sibling temp file first and is then renamed over the target.
    pub fn write(&self, path: &Path) -> Result<(), DeployError> {
        let io_err = |source| DeployError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        };

        let json = self.to_json().map_err(io_err)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;

        info!(path = %path.display(), entries = self.len(), "Manifest written");
        Ok(())
    }

    /// Write to `path`, falling back to its [`recovery_path`] when that
    /// fails. Errors only when neither file could be written.
    pub fn write_or_recover(&self, path: &Path) -> Result<Persisted, DeployError> {
        let error = match self.write(path) {
            Ok(()) => return Ok(Persisted::Canonical(path.to_path_buf())),
            Err(e) => e,
        };
        warn!(
            path = %path.display(),
            error = %error,
            "Manifest write failed, trying recovery file"
        );

        let recovery = recovery_path(path);
        self.write(&recovery)?;
        Ok(Persisted::Recovery {
            path: recovery,
            error,
        })
    }

    /// Pretty JSON with a trailing newline, exactly as written to disk.
    pub fn to_json(&self) -> Result<String, std::io::Error> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        json.push('\n');
        Ok(json)
    }

    /// Read a manifest written by [`write`](Self::write).
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Where [`DeploymentManifest::write_or_recover`] put the manifest.
#[derive(Debug)]
pub enum Persisted {
    /// The requested path
    Canonical(PathBuf),
    /// The recovery file, after the requested path failed with `error`
    Recovery { path: PathBuf, error: DeployError },
}

/// Where a partial manifest goes when a run aborts: `accounts.json` becomes
/// `accounts.partial.json` next to it.
pub fn recovery_path(manifest: &Path) -> PathBuf {
    let stem = manifest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("manifest");
    manifest.with_file_name(format!("{}.partial.json", stem))
}

impl Serialize for DeploymentManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, address) in &self.entries {
            map.serialize_entry(name, &address.to_checksum(None))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DeploymentManifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ManifestVisitor;

        impl<'de> Visitor<'de> for ManifestVisitor {
            type Value = DeploymentManifest;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a flat object of component name to address")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut manifest = DeploymentManifest::new();
                while let Some((name, address)) = access.next_entry::<String, Address>()? {
                    manifest
                        .record(&name, address)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(manifest)
            }
        }

        deserializer.deserialize_map(ManifestVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    #[test]
    fn test_record_is_append_only() {
        let mut manifest = DeploymentManifest::new();
        manifest.record("EtherOracle", addr(1)).unwrap();
        manifest.record("EtherOracle", addr(1)).unwrap();
        assert_eq!(manifest.len(), 1);

        let err = manifest.record("EtherOracle", addr(2)).unwrap_err();
        assert!(matches!(err, DeployError::ManifestConflict { .. }));
        assert_eq!(manifest.get("EtherOracle"), Some(addr(1)));
    }

    #[test]
    fn test_missing() {
        let mut manifest = DeploymentManifest::new();
        manifest.record("Manager", addr(1)).unwrap();
        assert_eq!(
            manifest.missing(["Manager", "callProxy"]),
            vec!["callProxy".to_string()]
        );
    }

    #[test]
    fn test_write_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let mut manifest = DeploymentManifest::new();
        manifest.record("UsdtOracle", addr(2)).unwrap();
        manifest.record("EtherOracle", addr(1)).unwrap();
        manifest.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let usdt = text.find("UsdtOracle").unwrap();
        let ether = text.find("EtherOracle").unwrap();
        assert!(usdt < ether);

        // Flat object of strings
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.values().all(|v| v.is_string()));

        let reread = DeploymentManifest::read(&path).unwrap();
        assert_eq!(reread, manifest);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_write_overwrites_previous_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, r#"{"Stale":"0x0000000000000000000000000000000000000009"}"#).unwrap();

        let mut manifest = DeploymentManifest::new();
        manifest.record("Manager", addr(1)).unwrap();
        manifest.write(&path).unwrap();

        let reread = DeploymentManifest::read(&path).unwrap();
        assert!(!reread.contains("Stale"));
        assert!(reread.contains("Manager"));
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go
        let path = dir.path().join("accounts.json");
        std::fs::create_dir(&path).unwrap();

        let err = DeploymentManifest::new().write(&path).unwrap_err();
        assert_eq!(err.kind(), "manifest_write");
    }

    #[test]
    fn test_failed_write_falls_back_to_recovery_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::create_dir(&path).unwrap();

        let mut manifest = DeploymentManifest::new();
        manifest.record("Manager", addr(1)).unwrap();
        manifest.record("callProxy", addr(2)).unwrap();

        match manifest.write_or_recover(&path).unwrap() {
            Persisted::Recovery { path: written, error } => {
                assert_eq!(written, dir.path().join("accounts.partial.json"));
                assert_eq!(error.kind(), "manifest_write");
                assert_eq!(DeploymentManifest::read(&written).unwrap(), manifest);
            }
            other => panic!("expected recovery file, got {:?}", other),
        }
    }

    #[test]
    fn test_write_or_recover_prefers_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let mut manifest = DeploymentManifest::new();
        manifest.record("Manager", addr(1)).unwrap();

        let persisted = manifest.write_or_recover(&path).unwrap();
        assert!(matches!(persisted, Persisted::Canonical(ref p) if *p == path));
        assert!(!recovery_path(&path).exists());
    }

    #[test]
    fn test_write_or_recover_fails_when_both_paths_fail() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the parent directory should be
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, "").unwrap();
        let path = blocker.join("accounts.json");

        let mut manifest = DeploymentManifest::new();
        manifest.record("Manager", addr(1)).unwrap();

        let err = manifest.write_or_recover(&path).unwrap_err();
        assert_eq!(err.kind(), "manifest_write");
        // Still recoverable from memory
        assert!(manifest.to_json().unwrap().contains("Manager"));
    }

    #[test]
    fn test_recovery_path() {
        assert_eq!(
            recovery_path(Path::new("out/accounts.json")),
            PathBuf::from("out/accounts.partial.json")
        );
    }
}
