//! Sample-name index: `sampleName<TAB>virtualOffset<LF>` text file alongside
//! the main file. An ordered, owned map rather than a hash of borrowed keys.

use crate::error::Error;
use std::fs;
use std::path::Path;

/// An ordered, insertion-preserving map from sample name to block offset.
#[derive(Debug, Default, Clone)]
pub struct SampleIndex {
    pairs: Vec<(String, u64)>,
}

impl SampleIndex {
    pub fn new() -> Self {
        SampleIndex { pairs: Vec::new() }
    }

    /// Derives the conventional `<main-path>.idx` sidecar path.
    pub fn sidecar_path(main_path: &Path) -> std::path::PathBuf {
        let mut s = main_path.as_os_str().to_owned();
        s.push(".idx");
        s.into()
    }

    /// Loads an index file. A missing file is reported via `Error::ResourceOpen`
    /// so callers that treat an index as optional can proceed without one.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)
            .map_err(|source| Error::ResourceOpen { path: path.display().to_string(), source })?;
        let mut idx = SampleIndex::new();
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(2, '\t');
            let name = parts.next().unwrap_or("");
            let offset_str = parts.next().ok_or_else(|| Error::CorruptAux {
                detail: format!("index line missing tab: {line:?}"),
            })?;
            let offset: u64 = offset_str.parse().map_err(|_| Error::CorruptAux {
                detail: format!("index offset not an integer: {offset_str:?}"),
            })?;
            idx.pairs.push((name.to_string(), offset));
        }
        Ok(idx)
    }

    /// Inserts `name -> offset`. Fails if `name` already exists, matching
    /// `insert_index`'s fatal check.
    pub fn insert(&mut self, name: impl Into<String>, offset: u64) -> Result<(), Error> {
        let name = name.into();
        if self.pairs.iter().any(|(k, _)| *k == name) {
            return Err(Error::CodecViolation { detail: format!("sample name already indexed: {name}") });
        }
        self.pairs.push((name, offset));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.pairs.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    /// Ordered `(name, offset)` pairs, insertion order preserved.
    pub fn pairs(&self) -> &[(String, u64)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let mut out = String::new();
        for (name, offset) in &self.pairs {
            out.push_str(name);
            out.push('\t');
            out.push_str(&offset.to_string());
            out.push('\n');
        }
        fs::write(path, out)
            .map_err(|source| Error::ResourceOpen { path: path.display().to_string(), source })
    }

    /// The sample-name list derived from an index file, in index order.
    pub fn names(&self) -> Vec<&str> {
        self.pairs.iter().map(|(k, _)| k.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_order_and_lookup() {
        let dir = std::env::temp_dir();
        let path = dir.join("yame_test_index_roundtrip.idx");

        let mut idx = SampleIndex::new();
        idx.insert("s1", 0).unwrap();
        idx.insert("s3", 4096).unwrap();
        idx.insert("s2", 1024).unwrap();
        idx.write(&path).unwrap();

        let reloaded = SampleIndex::load(&path).unwrap();
        assert_eq!(reloaded.get("s2"), Some(1024));
        assert_eq!(reloaded.get("s1"), Some(0));
        assert_eq!(reloaded.get("s3"), Some(4096));
        assert_eq!(reloaded.names(), vec!["s1", "s3", "s2"]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn insert_rejects_duplicate_name() {
        let mut idx = SampleIndex::new();
        idx.insert("a", 0).unwrap();
        assert!(idx.insert("a", 10).is_err());
    }

    #[test]
    fn missing_file_reports_resource_open() {
        let path = std::env::temp_dir().join("yame_test_index_missing_definitely.idx");
        let _ = std::fs::remove_file(&path);
        let err = SampleIndex::load(&path).unwrap_err();
        assert!(matches!(err, Error::ResourceOpen { .. }));
    }
}
