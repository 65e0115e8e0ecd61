//! Persistent Ed25519 host key

use crate::{PortfolioError, Result};
use russh::keys::PrivateKey;
use russh::keys::ssh_key::private::{Ed25519Keypair, KeypairData};
use russh::keys::ssh_key::{HashAlg, LineEnding};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

const KEY_COMMENT: &str = "sshfolio host key";

/// Loads the host key at `path`, generating and saving a new one if absent
///
/// A new key is written to a temporary file next to `path` and moved into
/// place, so a crash never leaves a truncated key behind. If another process
/// wins the race to create the file, its key is loaded instead.
pub fn load_or_generate(path: &Path) -> Result<PrivateKey> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let key = PrivateKey::from_openssh(&bytes)?;
            info!(path = %path.display(), fingerprint = %fingerprint(&key), "Loaded host key");
            Ok(key)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => generate(path),
        Err(source) => Err(host_key_error(path, source)),
    }
}

/// SHA-256 fingerprint in the familiar `SHA256:...` form
pub fn fingerprint(key: &PrivateKey) -> String {
    key.public_key().fingerprint(HashAlg::Sha256).to_string()
}

fn generate(path: &Path) -> Result<PrivateKey> {
    let seed: [u8; 32] = rand::random();
    let keypair = Ed25519Keypair::from_seed(&seed);
    let key = PrivateKey::new(KeypairData::from(keypair), KEY_COMMENT)?;
    let encoded = key.to_openssh(LineEnding::LF)?;

    match persist(path, encoded.as_bytes()) {
        Ok(()) => {
            info!(path = %path.display(), fingerprint = %fingerprint(&key), "Generated new host key");
            Ok(key)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => load_or_generate(path),
        Err(source) => Err(host_key_error(path, source)),
    }
}

fn persist(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    // NamedTempFile is created with mode 0600 on unix
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}

fn host_key_error(path: &Path, source: io::Error) -> PortfolioError {
    PortfolioError::HostKey {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generates_then_reloads_same_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys").join("host_ed25519");

        let first = load_or_generate(&path).unwrap();
        assert!(path.exists());
        let second = load_or_generate(&path).unwrap();

        assert_eq!(first.public_key(), second.public_key());
        assert_eq!(fingerprint(&first), fingerprint(&second));
        assert!(fingerprint(&first).starts_with("SHA256:"));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("host_ed25519");
        load_or_generate(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_corrupt_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("host_ed25519");
        std::fs::write(&path, "not a key").unwrap();

        assert!(matches!(
            load_or_generate(&path),
            Err(PortfolioError::KeyEncoding(_))
        ));
    }
}
