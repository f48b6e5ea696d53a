//! Directory of keystore files, one per identity
//!
//! Layout: `<root>/<identity>_keystore.json`. A nested layout
//! `<root>/<identity>/<identity>_keystore.json` is accepted when reading.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::encrypted::{DecryptedKey, Keystore};
use super::error::{KeystoreError, KeystoreResult};

/// File name suffix appended to the identity
pub const KEYSTORE_FILE_SUFFIX: &str = "_keystore.json";

/// Keystore files under a root directory
#[derive(Debug, Clone)]
pub struct KeystoreStore {
    root: PathBuf,
}

impl KeystoreStore {
    /// Open a store rooted at `root`, creating the directory (mode 0700) if
    /// it does not exist.
    pub fn new(root: impl AsRef<Path>) -> KeystoreResult<Self> {
        let root = root.as_ref();
        if !root.exists() {
            fs::create_dir_all(root)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(root, fs::Permissions::from_mode(0o700))?;
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<identity>_keystore.json`
    pub fn flat_path(&self, identity: &str) -> PathBuf {
        self.root.join(file_name(identity))
    }

    /// `<root>/<identity>/<identity>_keystore.json`
    pub fn nested_path(&self, identity: &str) -> PathBuf {
        self.root.join(identity).join(file_name(identity))
    }

    /// Find the keystore file for `identity`, flat layout first.
    pub fn locate(&self, identity: &str) -> KeystoreResult<PathBuf> {
        let flat = self.flat_path(identity);
        if flat.is_file() {
            return Ok(flat);
        }

        let nested = self.nested_path(identity);
        if nested.is_file() {
            return Ok(nested);
        }

        Err(KeystoreError::NotFound { flat, nested })
    }

    /// Whether a keystore exists for `identity` in either layout
    pub fn exists(&self, identity: &str) -> bool {
        self.locate(identity).is_ok()
    }

    /// Load and parse the record for `identity`
    pub fn load(&self, identity: &str) -> KeystoreResult<Keystore> {
        let path = self.locate(identity)?;
        debug!(identity, path = %path.display(), "Loading keystore");
        let json = fs::read_to_string(&path)?;
        Keystore::from_json(&json)
    }

    /// Load the record for `identity` and decrypt it
    pub fn decrypt(
        &self,
        identity: &str,
        password: impl AsRef<[u8]>,
    ) -> KeystoreResult<DecryptedKey> {
        self.load(identity)?.decrypt(password)
    }

    /// Write a new record to the flat path.
    ///
    /// Fails with [`KeystoreError::AlreadyExists`] if the file is present.
    pub fn save(&self, identity: &str, keystore: &Keystore) -> KeystoreResult<PathBuf> {
        let path = self.flat_path(identity);
        let json = serde_json::to_string_pretty(keystore)?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => KeystoreError::AlreadyExists(path.clone()),
            _ => KeystoreError::IoError(e),
        })?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        info!(identity, path = %path.display(), "Saved keystore");
        Ok(path)
    }

    /// Overwrite the flat record for `identity`, creating it if absent.
    ///
    /// The record is written to a 0600 sibling file and renamed over the
    /// old one, so the previous file's mode never applies to the new key.
    pub fn replace(&self, identity: &str, keystore: &Keystore) -> KeystoreResult<PathBuf> {
        let path = self.flat_path(identity);
        let tmp_path = self.root.join(format!(".{}.tmp", file_name(identity)));
        let json = serde_json::to_string_pretty(keystore)?;

        match fs::remove_file(&tmp_path) {
            Ok(()) => debug!(path = %tmp_path.display(), "Removed stale temp keystore"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(KeystoreError::IoError(e)),
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let written = options.open(&tmp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, &path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(KeystoreError::IoError(e));
        }

        info!(identity, path = %path.display(), "Replaced keystore");
        Ok(path)
    }
}

fn file_name(identity: &str) -> String {
    format!("{}{}", identity, KEYSTORE_FILE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{KdfChoice, KeystoreBuilder};
    use tempfile::TempDir;

    fn record(secret: &[u8], password: &str) -> Keystore {
        KeystoreBuilder::new()
            .private_key(secret)
            .password(password)
            .username("alice.sat")
            .role("validator")
            .kdf(KdfChoice::Scrypt {
                n: 1024,
                r: 8,
                p: 1,
                dklen: 32,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_save_and_decrypt() {
        let dir = TempDir::new().unwrap();
        let store = KeystoreStore::new(dir.path()).unwrap();

        let path = store.save("alice.sat", &record(&[0x42; 32], "pw")).unwrap();
        assert_eq!(path, dir.path().join("alice.sat_keystore.json"));
        assert!(store.exists("alice.sat"));

        let key = store.decrypt("alice.sat", "pw").unwrap();
        assert_eq!(key.expose_bytes(), &[0x42; 32]);
    }

    #[test]
    fn test_save_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = KeystoreStore::new(dir.path()).unwrap();

        store.save("alice.sat", &record(&[0x42; 32], "pw")).unwrap();
        let result = store.save("alice.sat", &record(&[0x43; 32], "pw"));
        assert!(matches!(result, Err(KeystoreError::AlreadyExists(_))));

        // original record untouched
        let key = store.decrypt("alice.sat", "pw").unwrap();
        assert_eq!(key.expose_bytes(), &[0x42; 32]);
    }

    #[test]
    fn test_replace_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = KeystoreStore::new(dir.path()).unwrap();

        store.save("alice.sat", &record(&[0x42; 32], "pw")).unwrap();
        store.replace("alice.sat", &record(&[0x43; 32], "pw")).unwrap();

        let key = store.decrypt("alice.sat", "pw").unwrap();
        assert_eq!(key.expose_bytes(), &[0x43; 32]);
    }

    #[test]
    fn test_nested_layout_fallback() {
        let dir = TempDir::new().unwrap();
        let store = KeystoreStore::new(dir.path()).unwrap();

        let nested = store.nested_path("bob.sat");
        fs::create_dir_all(nested.parent().unwrap()).unwrap();
        fs::write(&nested, record(&[0x44; 32], "pw").to_json().unwrap()).unwrap();

        assert_eq!(store.locate("bob.sat").unwrap(), nested);
        let key = store.decrypt("bob.sat", "pw").unwrap();
        assert_eq!(key.expose_bytes(), &[0x44; 32]);
    }

    #[test]
    fn test_flat_layout_preferred() {
        let dir = TempDir::new().unwrap();
        let store = KeystoreStore::new(dir.path()).unwrap();

        let nested = store.nested_path("bob.sat");
        fs::create_dir_all(nested.parent().unwrap()).unwrap();
        fs::write(&nested, record(&[0x44; 32], "pw").to_json().unwrap()).unwrap();
        store.save("bob.sat", &record(&[0x45; 32], "pw")).unwrap();

        assert_eq!(store.locate("bob.sat").unwrap(), store.flat_path("bob.sat"));
    }

    #[test]
    fn test_not_found_names_both_paths() {
        let dir = TempDir::new().unwrap();
        let store = KeystoreStore::new(dir.path()).unwrap();

        match store.locate("missing.sat") {
            Err(KeystoreError::NotFound { flat, nested }) => {
                assert_eq!(flat, dir.path().join("missing.sat_keystore.json"));
                assert_eq!(
                    nested,
                    dir.path().join("missing.sat").join("missing.sat_keystore.json")
                );
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_file_and_dir_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path().join("keys");
        let store = KeystoreStore::new(&root).unwrap();
        let path = store.save("alice.sat", &record(&[0x42; 32], "pw")).unwrap();

        let dir_mode = fs::metadata(&root).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        let file_mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_tightens_loose_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = KeystoreStore::new(dir.path()).unwrap();

        let path = store.flat_path("alice.sat");
        fs::write(&path, record(&[0x42; 32], "pw").to_json().unwrap()).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        store.replace("alice.sat", &record(&[0x43; 32], "pw")).unwrap();

        let file_mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let key = store.decrypt("alice.sat", "pw").unwrap();
        assert_eq!(key.expose_bytes(), &[0x43; 32]);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("alice.sat_keystore.json")]);
    }

    #[test]
    fn test_replace_clears_stale_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = KeystoreStore::new(dir.path()).unwrap();

        let stale = dir.path().join(".alice.sat_keystore.json.tmp");
        fs::write(&stale, "partial").unwrap();

        store.replace("alice.sat", &record(&[0x43; 32], "pw")).unwrap();

        assert!(!stale.exists());
        let key = store.decrypt("alice.sat", "pw").unwrap();
        assert_eq!(key.expose_bytes(), &[0x43; 32]);
    }
}
