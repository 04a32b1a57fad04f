//! Locations of the `.trackprep` folder holding settings, logs, and exports.
//!
//! The folder lives under the OS config directory unless
//! [`CONFIG_HOME_ENV`] names another base, which tests and portable installs use.

use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config base.
pub const APP_DIR_NAME: &str = ".trackprep";
/// Environment variable replacing the OS config directory as the base.
pub const CONFIG_HOME_ENV: &str = "TRACKPREP_CONFIG_HOME";

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// Neither the environment nor the OS provides a config base.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Folders kept under the application root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppDir {
    Root,
    Logs,
    Exports,
}

impl AppDir {
    fn child_name(self) -> Option<&'static str> {
        match self {
            Self::Root => None,
            Self::Logs => Some("logs"),
            Self::Exports => Some("exports"),
        }
    }

    /// Resolve this folder without touching the filesystem.
    pub fn path(self) -> Result<PathBuf, AppDirError> {
        let mut path = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
        path.push(APP_DIR_NAME);
        if let Some(child) = self.child_name() {
            path.push(child);
        }
        Ok(path)
    }

    /// Resolve this folder and create it when missing.
    pub fn ensure(self) -> Result<PathBuf, AppDirError> {
        let path = self.path()?;
        std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// The `.trackprep` root, created if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    AppDir::Root.ensure()
}

pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    AppDir::Logs.ensure()
}

/// Default destination for persisted trim assets.
pub fn exports_dir() -> Result<PathBuf, AppDirError> {
    AppDir::Exports.ensure()
}

fn config_base_dir() -> Option<PathBuf> {
    #[cfg(test)]
    if let Some(path) = test_base::get() {
        return Some(path);
    }
    std::env::var_os(CONFIG_HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
}

/// Per-thread base override so unit tests never share a directory.
#[cfg(test)]
pub(crate) mod test_base {
    use std::cell::RefCell;
    use std::path::PathBuf;

    thread_local! {
        static BASE: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
    }

    pub(crate) fn get() -> Option<PathBuf> {
        BASE.with(|base| base.borrow().clone())
    }

    /// Points this thread's app directories at `path` until dropped.
    pub(crate) struct BaseGuard;

    impl BaseGuard {
        pub(crate) fn set(path: PathBuf) -> Self {
            BASE.with(|base| *base.borrow_mut() = Some(path));
            Self
        }
    }

    impl Drop for BaseGuard {
        fn drop(&mut self) {
            BASE.with(|base| *base.borrow_mut() = None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_base::BaseGuard;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn root_is_created_under_the_base() {
        let base = tempdir().unwrap();
        let _guard = BaseGuard::set(base.path().to_path_buf());
        let root = app_root_dir().unwrap();
        assert_eq!(root, base.path().join(APP_DIR_NAME));
        assert!(root.is_dir());
    }

    #[test]
    fn path_resolves_without_creating() {
        let base = tempdir().unwrap();
        let _guard = BaseGuard::set(base.path().to_path_buf());
        let logs = AppDir::Logs.path().unwrap();
        assert_eq!(logs, base.path().join(APP_DIR_NAME).join("logs"));
        assert!(!logs.exists());
    }

    #[test]
    fn each_folder_has_its_own_child() {
        let base = tempdir().unwrap();
        let _guard = BaseGuard::set(base.path().to_path_buf());
        let root = base.path().join(APP_DIR_NAME);
        assert_eq!(logs_dir().unwrap(), root.join("logs"));
        assert_eq!(exports_dir().unwrap(), root.join("exports"));
        assert!(root.join("exports").is_dir());
    }
}
