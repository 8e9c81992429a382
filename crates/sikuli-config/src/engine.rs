//! Resolves the automation engine executable against the installation directory.
//!
//! The engine ships next to the server binary, so relative engine paths are
//! interpreted relative to the directory containing the running executable
//! rather than the process working directory.

use std::env;
use std::path::{Path, PathBuf};

use crate::ConfigWarning;
use crate::defaults::DEFAULT_ENGINE;

/// Returns the directory containing the running executable.
///
/// # Errors
///
/// Returns a [`ConfigWarning`] describing why the directory could not be
/// determined; callers fall back to the working directory.
pub fn installation_dir() -> Result<PathBuf, ConfigWarning> {
    let exe = env::current_exe().map_err(|error| ConfigWarning::InstallDirUnknown {
        reason: error.to_string(),
    })?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigWarning::InstallDirUnknown {
            reason: format!("executable '{}' has no parent directory", exe.display()),
        })
}

/// Resolves the engine path supplied on the command line.
///
/// Absolute paths are returned unchanged. Relative paths, and the default
/// engine name when none is supplied, are joined onto `install_dir`.
#[must_use]
pub fn resolve_engine(requested: Option<&Path>, install_dir: &Path) -> PathBuf {
    let requested = requested.unwrap_or_else(|| Path::new(DEFAULT_ENGINE));
    if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        install_dir.join(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_lives_in_install_dir() {
        let resolved = resolve_engine(None, Path::new("/opt/sikulid"));
        assert_eq!(resolved, Path::new("/opt/sikulid").join(DEFAULT_ENGINE));
    }

    #[test]
    fn relative_engine_joins_install_dir() {
        let resolved = resolve_engine(Some(Path::new("bin/runner")), Path::new("/opt/sikulid"));
        assert_eq!(resolved, Path::new("/opt/sikulid/bin/runner"));
    }

    #[cfg(unix)]
    #[test]
    fn absolute_engine_is_kept() {
        let resolved = resolve_engine(Some(Path::new("/usr/bin/true")), Path::new("/opt/sikulid"));
        assert_eq!(resolved, Path::new("/usr/bin/true"));
    }

    #[test]
    fn installation_dir_is_known_for_test_binary() {
        let dir = installation_dir().expect("test binary has a parent directory");
        assert!(dir.is_dir());
    }
}
