//! Dynamic plugin loading over the platform loader.
//!
//! A plugin is a shared object exporting three C-linkage entry points:
//! `plugin_metadata` (a nullary function returning a [`RawPluginMetadata`]
//! record by value), `create_plugin_instance` and `destroy_plugin_instance`
//! (a constructor/destructor pair for a library-owned instance). The loader
//! treats everything beyond those symbols as opaque.
//!
//! [`PluginLibrary`] owns one OS handle; [`PluginInstance`] pairs a created
//! instance with the destroy function of the library that produced it, and
//! keeps that library open for as long as the instance lives.
//! [`PluginManager`] indexes loaded libraries by absolute path and offers
//! directory discovery.

pub mod error;
#[cfg(unix)]
pub mod library;
#[cfg(unix)]
pub mod manager;
pub mod metadata;

pub use error::PluginError;
#[cfg(unix)]
pub use library::{PluginInstance, PluginLibrary};
#[cfg(unix)]
pub use manager::PluginManager;
pub use metadata::{PluginMetadata, RawPluginMetadata};

/// File-name fragment that marks a shared library on this platform.
#[must_use]
pub const fn default_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        ".dll"
    } else if cfg!(target_os = "macos") {
        ".dylib"
    } else {
        ".so"
    }
}
