//! On-disk fingerprint and value artifacts.
//!
//! Each cache key owns two files under the cache root:
//! `<key>.fingerprint` (JSON) and `<key>.value` (binary). Value artifacts
//! carry a small header with magic bytes, the payload encoding and a
//! checksum of the payload so truncated or tampered files are detected.
//! Absent and corrupt artifacts both read as `None`; only genuine I/O
//! failures are errors.
//!
//! Payloads are bincode when the value decodes back from bincode. Types that
//! need a self-describing format to deserialize (`serde_json::Value`,
//! untagged enums, flattened structs) are stored as JSON instead. A value
//! that round-trips through neither is rejected at write time.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stash_common::ContentHash;
use tracing::warn;

use crate::error::CacheError;
use crate::fingerprint::Fingerprint;
use crate::key::CacheKey;

/// Extension of fingerprint artifacts.
pub const FINGERPRINT_EXT: &str = "fingerprint";

/// Extension of value artifacts.
pub const VALUE_EXT: &str = "value";

/// Magic bytes identifying a stash value artifact.
const VALUE_MAGIC: [u8; 4] = *b"STSH";

/// Header prepended to every value artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ValueHeader {
    magic: [u8; 4],
    encoding: PayloadEncoding,
    checksum: ContentHash,
}

/// How a value artifact's payload is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PayloadEncoding {
    Bincode,
    Json,
}

/// A store mapping each cache key to one artifact file.
pub trait ArtifactStore {
    /// The type persisted in each artifact.
    type Item;

    /// Directory holding the artifacts.
    fn root(&self) -> &Path;

    /// File extension distinguishing this store's artifacts.
    fn extension(&self) -> &'static str;

    /// Reads the artifact for `key`. `Ok(None)` means absent or unreadable.
    fn read(&self, key: &CacheKey) -> Result<Option<Self::Item>, CacheError>;

    /// Writes the artifact for `key`, replacing any previous one.
    fn write(&self, key: &CacheKey, item: &Self::Item) -> Result<(), CacheError>;

    /// Returns the artifact path for `key`.
    fn path(&self, key: &CacheKey) -> PathBuf {
        self.root().join(format!("{key}.{}", self.extension()))
    }

    /// Returns `true` if an artifact exists for `key`.
    fn exists(&self, key: &CacheKey) -> bool {
        self.path(key).is_file()
    }

    /// Deletes the artifact for `key`. Returns `false` if there was none.
    fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }
}

/// Reads a whole file, mapping "not found" to `None`.
fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Fingerprint artifacts, stored as JSON.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    root: PathBuf,
}

impl FingerprintStore {
    /// Creates a store rooted at the given cache directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl ArtifactStore for FingerprintStore {
    type Item = Fingerprint;

    fn root(&self) -> &Path {
        &self.root
    }

    fn extension(&self) -> &'static str {
        FINGERPRINT_EXT
    }

    fn read(&self, key: &CacheKey) -> Result<Option<Fingerprint>, CacheError> {
        let path = self.path(key);
        let Some(bytes) = read_bytes(&path)? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(fingerprint) => Ok(Some(fingerprint)),
            Err(e) => {
                warn!("ignoring corrupt fingerprint {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    fn write(&self, key: &CacheKey, item: &Fingerprint) -> Result<(), CacheError> {
        let path = self.path(key);
        let json = serde_json::to_vec_pretty(item).map_err(CacheError::serialization)?;
        std::fs::write(&path, json).map_err(|e| CacheError::io(path, e))
    }
}

/// Value artifacts: header + bincode payload.
#[derive(Debug, Clone)]
pub struct ValueStore<T> {
    root: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ValueStore<T> {
    /// Creates a store rooted at the given cache directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            _marker: PhantomData,
        }
    }
}

impl<T> ArtifactStore for ValueStore<T>
where
    T: Serialize + DeserializeOwned,
{
    type Item = T;

    fn root(&self) -> &Path {
        &self.root
    }

    fn extension(&self) -> &'static str {
        VALUE_EXT
    }

    fn read(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        let path = self.path(key);
        let Some(raw) = read_bytes(&path)? else {
            return Ok(None);
        };
        match decode_value(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(reason) => {
                warn!("ignoring corrupt value {}: {reason}", path.display());
                Ok(None)
            }
        }
    }

    fn write(&self, key: &CacheKey, item: &T) -> Result<(), CacheError> {
        let path = self.path(key);
        let output = encode_value(item)?;
        std::fs::write(&path, &output).map_err(|e| CacheError::io(path, e))
    }
}

/// Layout: 4-byte header length (little-endian) + header + payload.
fn encode_value<T: Serialize + DeserializeOwned>(value: &T) -> Result<Vec<u8>, CacheError> {
    let (encoding, payload) = encode_payload(value)?;
    let header = ValueHeader {
        magic: VALUE_MAGIC,
        encoding,
        checksum: ContentHash::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(CacheError::serialization)?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Picks the first encoding the value decodes back from.
fn encode_payload<T: Serialize + DeserializeOwned>(
    value: &T,
) -> Result<(PayloadEncoding, Vec<u8>), CacheError> {
    let bincode_err = match bincode::serde::encode_to_vec(value, bincode::config::standard()) {
        Ok(payload) => match decode_payload::<T>(PayloadEncoding::Bincode, &payload) {
            Ok(_) => return Ok((PayloadEncoding::Bincode, payload)),
            Err(e) => e,
        },
        Err(e) => e.to_string(),
    };

    let payload = serde_json::to_vec(value).map_err(CacheError::serialization)?;
    decode_payload::<T>(PayloadEncoding::Json, &payload).map_err(|json_err| {
        CacheError::serialization(format!(
            "value does not read back (bincode: {bincode_err}; json: {json_err})"
        ))
    })?;
    Ok((PayloadEncoding::Json, payload))
}

fn decode_payload<T: DeserializeOwned>(
    encoding: PayloadEncoding,
    payload: &[u8],
) -> Result<T, String> {
    match encoding {
        PayloadEncoding::Bincode => {
            let (value, read) =
                bincode::serde::decode_from_slice(payload, bincode::config::standard())
                    .map_err(|e| e.to_string())?;
            if read != payload.len() {
                return Err(format!("{} trailing bytes", payload.len() - read));
            }
            Ok(value)
        }
        PayloadEncoding::Json => serde_json::from_slice(payload).map_err(|e| e.to_string()),
    }
}

fn decode_value<T: DeserializeOwned>(raw: &[u8]) -> Result<T, String> {
    let len_bytes: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or("truncated header length")?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_bytes = raw.get(4..4 + header_len).ok_or("truncated header")?;

    let (header, _): (ValueHeader, usize) =
        bincode::serde::decode_from_slice(header_bytes, bincode::config::standard())
            .map_err(|e| e.to_string())?;
    if header.magic != VALUE_MAGIC {
        return Err("bad magic bytes".to_string());
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(format!(
            "checksum mismatch: expected {}, got {actual}",
            header.checksum
        ));
    }

    decode_payload(header.encoding, payload)
}

/// Lists the keys that have an artifact with extension `ext` under `root`.
///
/// Files whose stem is not a valid cache key are ignored. A missing root
/// yields an empty set.
pub fn scan_keys(root: &Path, ext: &str) -> Result<BTreeSet<CacheKey>, CacheError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(CacheError::io(root, e)),
    };

    let mut keys = BTreeSet::new();
    for entry in entries {
        let path = entry.map_err(|e| CacheError::io(root, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        if let Some(key) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(CacheKey::parse)
        {
            keys.insert(key);
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::WhitespaceCanonicalizer;
    use crate::fingerprint::FingerprintBuilder;
    use crate::scope::Scope;

    fn key(name: &str) -> CacheKey {
        CacheKey::parse(name).unwrap()
    }

    fn sample_fingerprint() -> Fingerprint {
        let mut scope = Scope::new();
        scope.set_value("dep", &5).unwrap();
        FingerprintBuilder::new(&WhitespaceCanonicalizer)
            .build("r1 = 10 + dep", &["dep".to_string()], &scope)
            .unwrap()
    }

    #[test]
    fn fingerprint_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::new(dir.path());
        let fp = sample_fingerprint();

        assert!(!store.exists(&key("r1")));
        store.write(&key("r1"), &fp).unwrap();
        assert!(store.exists(&key("r1")));
        assert_eq!(store.read(&key("r1")).unwrap(), Some(fp));
    }

    #[test]
    fn fingerprint_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::new(dir.path());
        assert!(store.read(&key("absent")).unwrap().is_none());
    }

    #[test]
    fn fingerprint_corrupt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::new(dir.path());
        std::fs::write(store.path(&key("bad")), b"{ not json").unwrap();
        assert!(store.read(&key("bad")).unwrap().is_none());
    }

    #[test]
    fn artifacts_use_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let fps = FingerprintStore::new(dir.path());
        let values: ValueStore<i64> = ValueStore::new(dir.path());
        let k = key("r1");
        assert_ne!(fps.path(&k), values.path(&k));
        assert!(fps.path(&k).ends_with("r1.fingerprint"));
        assert!(values.path(&k).ends_with("r1.value"));
    }

    #[test]
    fn value_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<Vec<f64>> = ValueStore::new(dir.path());
        let data = vec![1.5, 2.5, 3.5];
        store.write(&key("series"), &data).unwrap();
        assert_eq!(store.read(&key("series")).unwrap(), Some(data));
    }

    #[test]
    fn value_struct_payload() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Summary {
            label: String,
            counts: Vec<u32>,
            mean: Option<f64>,
        }
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<Summary> = ValueStore::new(dir.path());
        let summary = Summary {
            label: "run".to_string(),
            counts: vec![3, 1, 4],
            mean: Some(2.67),
        };
        store.write(&key("summary"), &summary).unwrap();
        assert_eq!(store.read(&key("summary")).unwrap(), Some(summary));
    }

    #[test]
    fn value_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<i64> = ValueStore::new(dir.path());
        assert!(store.read(&key("absent")).unwrap().is_none());
    }

    #[test]
    fn value_garbage_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<i64> = ValueStore::new(dir.path());
        std::fs::write(store.path(&key("junk")), b"garbage data").unwrap();
        assert!(store.read(&key("junk")).unwrap().is_none());
    }

    #[test]
    fn value_truncated_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<i64> = ValueStore::new(dir.path());
        std::fs::write(store.path(&key("short")), b"AB").unwrap();
        assert!(store.read(&key("short")).unwrap().is_none());
    }

    #[test]
    fn value_tampered_payload_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<String> = ValueStore::new(dir.path());
        store.write(&key("text"), &"original".to_string()).unwrap();

        let path = store.path(&key("text"));
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        std::fs::write(&path, &raw).unwrap();

        assert!(store.read(&key("text")).unwrap().is_none());
    }

    #[test]
    fn value_wrong_magic_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<i64> = ValueStore::new(dir.path());
        let config = bincode::config::standard();
        let payload = bincode::serde::encode_to_vec(7i64, config).unwrap();
        let header = ValueHeader {
            magic: *b"BAAD",
            encoding: PayloadEncoding::Bincode,
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, config).unwrap();
        let mut output = Vec::new();
        output.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);
        std::fs::write(store.path(&key("magic")), &output).unwrap();

        assert!(store.read(&key("magic")).unwrap().is_none());
    }

    #[test]
    fn json_value_payload_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<serde_json::Value> = ValueStore::new(dir.path());
        let value = serde_json::json!({"n": 3, "tags": ["a", "b"], "nested": {"x": null}});
        store.write(&key("doc"), &value).unwrap();
        assert_eq!(store.read(&key("doc")).unwrap(), Some(value));
    }

    #[test]
    fn untagged_enum_payload_reads_back() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        #[serde(untagged)]
        enum Out {
            N(i64),
            S(String),
        }
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<Out> = ValueStore::new(dir.path());
        store.write(&key("n"), &Out::N(4)).unwrap();
        store.write(&key("s"), &Out::S("four".to_string())).unwrap();
        assert_eq!(store.read(&key("n")).unwrap(), Some(Out::N(4)));
        assert_eq!(store.read(&key("s")).unwrap(), Some(Out::S("four".to_string())));
    }

    #[test]
    fn plain_values_stay_bincode() {
        let (encoding, _) = encode_payload(&vec![1u32, 2, 3]).unwrap();
        assert_eq!(encoding, PayloadEncoding::Bincode);
        let (encoding, _) = encode_payload(&serde_json::json!([1, 2])).unwrap();
        assert_eq!(encoding, PayloadEncoding::Json);
    }

    #[test]
    fn unreadable_value_is_rejected_on_write() {
        // Serializes as a string but only accepts an integer back.
        #[derive(Debug)]
        struct OneWay;
        impl Serialize for OneWay {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str("one-way")
            }
        }
        impl<'de> Deserialize<'de> for OneWay {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                u64::deserialize(d).map(|_| OneWay)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<OneWay> = ValueStore::new(dir.path());
        let err = store.write(&key("bad"), &OneWay).unwrap_err();
        assert!(matches!(err, CacheError::Serialization { .. }));
        assert!(!store.exists(&key("bad")));
    }

    #[test]
    fn remove_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let store: ValueStore<i64> = ValueStore::new(dir.path());
        store.write(&key("gone"), &1).unwrap();
        assert!(store.remove(&key("gone")).unwrap());
        assert!(!store.remove(&key("gone")).unwrap());
        assert!(!store.exists(&key("gone")));
    }

    #[test]
    fn scan_keys_filters_by_extension_and_stem() {
        let dir = tempfile::tempdir().unwrap();
        let values: ValueStore<i64> = ValueStore::new(dir.path());
        values.write(&key("a"), &1).unwrap();
        values.write(&key("b"), &2).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("bad name.value"), "x").unwrap();

        let keys = scan_keys(dir.path(), VALUE_EXT).unwrap();
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec![key("a"), key("b")]);
    }

    #[test]
    fn scan_keys_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let keys = scan_keys(&dir.path().join("nope"), VALUE_EXT).unwrap();
        assert!(keys.is_empty());
    }
}
