//! In-place replacement without a window where the original is gone.
//!
//! New content is written to a temp file in the same directory and renamed
//! over the target. A failed write leaves the original byte-identical and
//! the temp file is removed when it drops.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Write new content for `target` through `write` and swap it in.
/// Returns the size of the new file.
pub fn replace_atomically<F, E>(target: &Path, write: F) -> Result<u64, E>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), E>,
    E: From<io::Error>,
{
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }

    if let Ok(meta) = fs::metadata(target) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.as_file().sync_all()?;
    let len = tmp.as_file().metadata()?.len();

    tmp.persist(target).map_err(|e| E::from(e.error))?;
    Ok(len)
}

/// Cheap sanity check on an encoder's output before it replaces anything:
/// it exists, is at least `min_size` bytes and can be read.
pub fn verify_output_integrity(output: &Path, min_size: u64) -> Result<(), String> {
    let metadata = match fs::metadata(output) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err("Output file does not exist".to_string())
        }
        Err(e) => return Err(format!("Cannot read output metadata: {}", e)),
    };

    if metadata.len() == 0 {
        return Err("Output file is empty (0 bytes)".to_string());
    }

    if metadata.len() < min_size {
        return Err(format!(
            "Output file too small: {} < {} bytes",
            metadata.len(),
            min_size
        ));
    }

    let mut file = OpenOptions::new()
        .read(true)
        .open(output)
        .map_err(|e| format!("Cannot open output file: {}", e))?;
    let mut buffer = [0u8; 16];
    file.read(&mut buffer)
        .map_err(|e| format!("Cannot read output file: {}", e))?;

    Ok(())
}
