//! rkyv-based binary persistence.

use rkyv::rancor::Error as RkyvError;
use rkyv::{from_bytes, to_bytes};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::fingerprint::content_hash;

use super::{ArtifactKey, ArtifactStore, CorpusSnapshot};

const FORMAT_VERSION: u32 = 1;

/// On-disk layout of a snapshot.
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
struct SnapshotData {
    version: u32,
    dimension: u64,
    fingerprint: u64,
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl From<&CorpusSnapshot> for SnapshotData {
    fn from(snapshot: &CorpusSnapshot) -> Self {
        Self {
            version: FORMAT_VERSION,
            dimension: snapshot.dimension as u64,
            fingerprint: snapshot.fingerprint,
            chunks: snapshot.chunks.clone(),
            embeddings: snapshot.embeddings.clone(),
        }
    }
}

impl TryFrom<SnapshotData> for CorpusSnapshot {
    type Error = RagError;

    fn try_from(data: SnapshotData) -> Result<Self> {
        if data.version != FORMAT_VERSION {
            return Err(RagError::Serialization(format!(
                "unsupported snapshot version {}",
                data.version
            )));
        }
        let dimension = usize::try_from(data.dimension)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        Ok(Self {
            dimension,
            fingerprint: data.fingerprint,
            chunks: data.chunks,
            embeddings: data.embeddings,
        })
    }
}

/// Binary snapshot files using rkyv, one file per artifact.
///
/// Files live under `root/<owner>/`, named after the document with a hash suffix so
/// that names which sanitize to the same string stay distinct.
///
/// # Example
///
/// ```rust,no_run
/// use docqa_rag::persistence::{ArtifactKey, ArtifactStore, RkyvStore};
///
/// let store = RkyvStore::new("./artifacts");
/// let key = ArtifactKey::new("alice", "report.pdf").unwrap();
/// let snapshot = store.load(&key).unwrap();
/// ```
#[derive(Debug)]
pub struct RkyvStore {
    root: PathBuf,
}

impl RkyvStore {
    /// Creates a store rooted at `root`. Nothing is created until the first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File that holds the snapshot for `key`.
    #[must_use]
    pub fn file_for(&self, key: &ArtifactKey) -> PathBuf {
        let hash = content_hash(&key.storage_key());
        self.root.join(sanitize(key.owner())).join(format!(
            "{}-{hash:016x}.rkyv",
            sanitize(key.document())
        ))
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .take(64)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl ArtifactStore for RkyvStore {
    fn save(&self, key: &ArtifactKey, snapshot: &CorpusSnapshot) -> Result<()> {
        let path = self.file_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RagError::Persistence {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let bytes = to_bytes::<RkyvError>(&SnapshotData::from(snapshot))
            .map_err(|e| RagError::Serialization(e.to_string()))?;

        fs::write(&path, &bytes).map_err(|e| RagError::Persistence { path, source: e })?;
        Ok(())
    }

    fn load(&self, key: &ArtifactKey) -> Result<Option<CorpusSnapshot>> {
        let path = self.file_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RagError::Persistence { path, source: e }),
        };

        let data = from_bytes::<SnapshotData, RkyvError>(&bytes)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        CorpusSnapshot::try_from(data).map(Some)
    }

    fn remove(&self, key: &ArtifactKey) -> Result<bool> {
        let path = self.file_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RagError::Persistence { path, source: e }),
        }
    }

    fn path(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::corpus_fingerprint;
    use tempfile::tempdir;

    fn snapshot(texts: &[&str]) -> CorpusSnapshot {
        CorpusSnapshot {
            dimension: 3,
            fingerprint: corpus_fingerprint(texts.iter().copied()),
            chunks: texts.iter().map(|t| (*t).to_owned()).collect(),
            embeddings: texts.iter().map(|_| vec![1.0, 2.0, 3.0]).collect(),
        }
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let store = RkyvStore::new(dir.path());
        let key = ArtifactKey::new("alice", "report.pdf").unwrap();

        store.save(&key, &snapshot(&["hello", "world"])).unwrap();
        assert!(store.file_for(&key).exists());

        let loaded = store.load(&key).unwrap().unwrap();
        assert_eq!(loaded, snapshot(&["hello", "world"]));
    }

    #[test]
    fn load_nonexistent() {
        let dir = tempdir().unwrap();
        let store = RkyvStore::new(dir.path().join("nothing-here"));
        let key = ArtifactKey::new("bob", "notes.txt").unwrap();
        assert!(store.load(&key).unwrap().is_none());
    }

    #[test]
    fn owners_are_isolated() {
        let dir = tempdir().unwrap();
        let store = RkyvStore::new(dir.path());
        let alice = ArtifactKey::new("alice", "report.pdf").unwrap();
        let bob = ArtifactKey::new("bob", "report.pdf").unwrap();

        store.save(&alice, &snapshot(&["alice's"])).unwrap();
        store.save(&bob, &snapshot(&["bob's"])).unwrap();

        assert_eq!(store.load(&alice).unwrap().unwrap().chunks, vec!["alice's"]);
        assert_eq!(store.load(&bob).unwrap().unwrap().chunks, vec!["bob's"]);
    }

    #[test]
    fn hostile_names_stay_inside_root() {
        let dir = tempdir().unwrap();
        let store = RkyvStore::new(dir.path());
        let key = ArtifactKey::new("../..", "../etc/passwd").unwrap();
        assert!(store.file_for(&key).starts_with(dir.path()));
        assert_ne!(
            store.file_for(&key),
            store.file_for(&ArtifactKey::new("__", "___etc_passwd").unwrap())
        );
    }

    #[test]
    fn remove_snapshot() {
        let dir = tempdir().unwrap();
        let store = RkyvStore::new(dir.path());
        let key = ArtifactKey::new("alice", "report.pdf").unwrap();

        store.save(&key, &snapshot(&["x"])).unwrap();
        assert!(store.remove(&key).unwrap());
        assert!(!store.remove(&key).unwrap());
        assert!(store.load(&key).unwrap().is_none());
    }

    #[test]
    fn garbage_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let store = RkyvStore::new(dir.path());
        let key = ArtifactKey::new("alice", "report.pdf").unwrap();
        let path = store.file_for(&key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not a snapshot").unwrap();

        assert!(matches!(store.load(&key), Err(RagError::Serialization(_))));
    }
}
