//! Plugin metadata crossing the C ABI.

use std::ffi::{c_char, CStr};

use serde::{Deserialize, Serialize};

/// Metadata record as exported by a plugin's `plugin_metadata` symbol.
///
/// Returned by value. Each field is either null or a pointer to a
/// NUL-terminated UTF-8 string that lives inside the plugin image and stays
/// valid while the library is open.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawPluginMetadata {
    pub name: *const c_char,
    pub version: *const c_char,
    pub description: *const c_char,
    pub author: *const c_char,
    pub license: *const c_char,
}

/// Owned metadata copied out of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,
}

impl PluginMetadata {
    /// Copies a raw record into owned strings. A null field degrades to an
    /// empty string and invalid UTF-8 is replaced, so a sloppy plugin can
    /// still be listed.
    ///
    /// # Safety
    ///
    /// Every non-null field must point to a NUL-terminated string valid for
    /// the duration of the call.
    pub(crate) unsafe fn from_raw(raw: &RawPluginMetadata) -> Self {
        // SAFETY: field pointers forwarded under the caller's guarantee.
        unsafe {
            Self {
                name: copy_c_str(raw.name),
                version: copy_c_str(raw.version),
                description: copy_c_str(raw.description),
                author: copy_c_str(raw.author),
                license: copy_c_str(raw.license),
            }
        }
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string valid for the
/// duration of the call.
unsafe fn copy_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: non-null per the check above, NUL-terminated per the contract.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
