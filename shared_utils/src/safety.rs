//! Safety Module
//!
//! Refuses to run a destructive batch on system directories or a home
//! directory root. Both pipelines replace files in place, so the target is
//! checked before anything is discovered or written.

use std::path::Path;

const DANGEROUS_DIRS: &[&str] = &[
    "/",
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/var",
    "/private",
    "/Library",
    "/Applications",
    "/Users",
    "/home",
    "/root",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/tmp",
    "/opt",
];

/// `Err` carries the message shown to the user.
pub fn check_dangerous_directory(path: &Path) -> Result<(), String> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    for candidate in [path, canonical.as_path()] {
        let path_str = candidate.to_string_lossy();
        if let Some(dangerous) = DANGEROUS_DIRS.iter().find(|d| path_str == **d) {
            return Err(format!(
                "🚨 DANGEROUS OPERATION BLOCKED!\n\
                 ❌ Target directory '{}' is a protected system directory.\n\
                 ❌ Files there would be rewritten in place.\n\
                 \n\
                 💡 Please specify a media subdirectory instead.",
                dangerous
            ));
        }
    }

    let path_str = canonical.to_string_lossy();
    let depth = canonical.components().count();
    if depth <= 3 && (path_str.starts_with("/Users/") || path_str.starts_with("/home/")) {
        return Err(format!(
            "🚨 DANGEROUS OPERATION BLOCKED!\n\
             ❌ Target '{}' is a home directory root.\n\
             \n\
             💡 Please specify a subdirectory like ~/Pictures/export instead.",
            path.display()
        ));
    }

    Ok(())
}
