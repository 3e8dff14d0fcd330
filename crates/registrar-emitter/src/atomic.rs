use std::path::{Path, PathBuf};

use registrar_core::{Error, Result};
use sha2::{Digest, Sha256};

const TEMP_SUFFIX: &str = ".tmp";

/// Writes `content` to `target` atomically: write to a sibling temp file,
/// verify its hash matches what was intended, then rename over the
/// target. On unix, also `fsync`s the parent directory so the rename
/// survives a crash. Returns the content's hex-encoded SHA-256 hash.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<String> {
    let hash = hex::encode(Sha256::digest(content));

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|err| Error::emit_failure("creating parent directory", err))?;
    }

    let temp_path: PathBuf = target.with_extension(format!(
        "{}{TEMP_SUFFIX}",
        target.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    std::fs::write(&temp_path, content).map_err(|err| Error::emit_failure("writing temp file", err))?;

    let verify = hex::encode(Sha256::digest(
        std::fs::read(&temp_path).map_err(|err| Error::emit_failure("re-reading temp file", err))?,
    ));
    if verify != hash {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::emit_failure(
            "content hash mismatch after write",
            std::io::Error::other("integrity check failed"),
        ));
    }

    std::fs::rename(&temp_path, target).map_err(|err| Error::emit_failure("renaming into place", err))?;

    #[cfg(unix)]
    if let Some(parent) = target.parent() {
        if let Ok(dir) = std::fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(hash)
}
