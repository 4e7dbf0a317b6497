//! Loader failure types.

use std::path::PathBuf;

use thiserror::Error;

/// Failures from loading, resolving, or indexing plugin libraries.
#[derive(Debug, Error)]
pub enum PluginError {
    /// `load` was given a path that is already registered.
    #[error("plugin already loaded: {}", path.display())]
    AlreadyLoaded {
        /// Absolute path of the duplicate.
        path: PathBuf,
    },

    /// The platform loader refused to open the shared object.
    #[error("failed to open {}: {reason}", path.display())]
    LibraryOpen {
        /// Path that was handed to the loader.
        path: PathBuf,
        /// Loader-reported reason, when one was available.
        reason: String,
    },

    /// A required exported symbol is absent from the library.
    #[error("symbol `{symbol}` not found in {}", path.display())]
    SymbolMissing {
        /// Library missing the symbol.
        path: PathBuf,
        /// Unmangled symbol name.
        symbol: &'static str,
    },

    /// The library's `create_plugin_instance` returned null.
    #[error("create_plugin_instance returned null in {}", path.display())]
    InstanceCreation {
        /// Library whose constructor failed.
        path: PathBuf,
    },

    /// Directory discovery or path normalization failed.
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn messages_name_the_offending_path() {
        let err = PluginError::SymbolMissing {
            path: Path::new("/plugins/libdemo.so").to_path_buf(),
            symbol: "plugin_metadata",
        };
        assert_eq!(
            err.to_string(),
            "symbol `plugin_metadata` not found in /plugins/libdemo.so"
        );
    }
}
