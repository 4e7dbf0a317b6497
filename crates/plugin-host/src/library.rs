//! Loaded shared objects and library-owned instances.

use std::ffi::{c_void, CStr, CString};
use std::mem;
use std::ops::{Deref, DerefMut};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::PluginError;
use crate::metadata::{PluginMetadata, RawPluginMetadata};

type MetadataFn = unsafe extern "C" fn() -> RawPluginMetadata;

/// A shared object opened through the platform loader.
///
/// The OS handle stays open for the lifetime of this value and is closed on
/// drop. Instances created through [`PluginInstance::create`] hold their own
/// `Arc` to the library, so the handle cannot close underneath them.
pub struct PluginLibrary {
    handle: NonNull<c_void>,
    path: PathBuf,
}

// SAFETY: the loader handle is a process-global token; `dlsym` and
// `dlclose` on it are thread-safe in the platform loader. Whether the
// loaded plugin's own code is thread-safe is the plugin's business.
unsafe impl Send for PluginLibrary {}
unsafe impl Sync for PluginLibrary {}

impl PluginLibrary {
    /// Opens the shared object at `path`.
    ///
    /// The manager always passes absolute paths; a bare file name falls
    /// back to the platform's library search path, as `dlopen` defines it.
    pub fn open(path: &Path) -> Result<Self, PluginError> {
        let c_path =
            CString::new(path.as_os_str().as_bytes()).map_err(|_| PluginError::LibraryOpen {
                path: path.to_path_buf(),
                reason: "path contains an interior NUL byte".to_owned(),
            })?;

        // SAFETY: `c_path` is a valid NUL-terminated string.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY | libc::RTLD_LOCAL) };
        match NonNull::new(handle) {
            Some(handle) => Ok(Self {
                handle,
                path: path.to_path_buf(),
            }),
            None => Err(PluginError::LibraryOpen {
                path: path.to_path_buf(),
                reason: last_dl_error(),
            }),
        }
    }

    /// Path this library was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the library's metadata record by calling its `plugin_metadata`
    /// entry point.
    pub fn metadata(&self) -> Result<PluginMetadata, PluginError> {
        let func: MetadataFn = self.symbol(c"plugin_metadata")?;
        // SAFETY: the ABI contract says `plugin_metadata` is nullary and
        // returns the record by value, with field strings valid at least
        // until the library closes.
        let raw = unsafe { func() };
        // SAFETY: as above; the strings outlive this call.
        Ok(unsafe { PluginMetadata::from_raw(&raw) })
    }

    /// Resolves `name` to a value of function-pointer type `F`.
    pub(crate) fn symbol<F: Copy>(&self, name: &'static CStr) -> Result<F, PluginError> {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());

        // SAFETY: the handle is live and `name` is NUL-terminated.
        let sym = unsafe { libc::dlsym(self.handle.as_ptr(), name.as_ptr()) };
        if sym.is_null() {
            return Err(PluginError::SymbolMissing {
                path: self.path.clone(),
                symbol: name.to_str().unwrap_or("?"),
            });
        }
        // SAFETY: `F` is a pointer-sized function-pointer type at every call
        // site, and the loader returned a non-null code address for it.
        Ok(unsafe { mem::transmute_copy::<*mut c_void, F>(&sym) })
    }
}

impl Drop for PluginLibrary {
    fn drop(&mut self) {
        // SAFETY: the handle came from `dlopen` and is closed exactly once.
        unsafe { libc::dlclose(self.handle.as_ptr()) };
    }
}

impl std::fmt::Debug for PluginLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Most recent loader error, or a fixed fallback when the loader reports
/// none.
fn last_dl_error() -> String {
    // SAFETY: `dlerror` returns a thread-local message pointer or null.
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown loader error".to_owned()
    } else {
        // SAFETY: a non-null `dlerror` result is NUL-terminated and valid
        // until the next loader call on this thread.
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

/// Owning guard for one library-created instance.
///
/// Created by [`PluginInstance::create`]. On drop it hands the instance
/// pointer back to the `destroy_plugin_instance` of the library that built
/// it, then releases its `Arc` on the library, so the destroy call always
/// runs against a still-open image.
pub struct PluginInstance<T> {
    ptr: NonNull<T>,
    destroy: unsafe extern "C" fn(*mut T),
    library: Arc<PluginLibrary>,
}

impl<T> PluginInstance<T> {
    /// Calls `library`'s `create_plugin_instance` and wraps the result.
    ///
    /// Fails with [`PluginError::SymbolMissing`] if either entry point is
    /// absent and with [`PluginError::InstanceCreation`] if the constructor
    /// returns null.
    ///
    /// # Safety
    ///
    /// `T` must be exactly the type this library's `create_plugin_instance`
    /// produces and its `destroy_plugin_instance` expects.
    pub unsafe fn create(library: &Arc<PluginLibrary>) -> Result<Self, PluginError> {
        let create: unsafe extern "C" fn() -> *mut T =
            library.symbol(c"create_plugin_instance")?;
        let destroy: unsafe extern "C" fn(*mut T) = library.symbol(c"destroy_plugin_instance")?;

        // SAFETY: nullary constructor per the ABI contract; ownership of
        // the returned pointer transfers to us.
        let raw = unsafe { create() };
        let Some(ptr) = NonNull::new(raw) else {
            return Err(PluginError::InstanceCreation {
                path: library.path.clone(),
            });
        };

        Ok(Self {
            ptr,
            destroy,
            library: Arc::clone(library),
        })
    }

    /// The library that created this instance.
    #[must_use]
    pub fn library(&self) -> &Arc<PluginLibrary> {
        &self.library
    }
}

impl<T> Deref for PluginInstance<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: `ptr` is non-null and exclusively owned until drop.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for PluginInstance<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as in `deref`, plus `&mut self` rules out other borrows.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for PluginInstance<T> {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from this library's create function and is
        // destroyed exactly once, before `library` can drop its handle.
        unsafe { (self.destroy)(self.ptr.as_ptr()) };
    }
}

impl<T> std::fmt::Debug for PluginInstance<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("library", &self.library.path)
            .finish_non_exhaustive()
    }
}
