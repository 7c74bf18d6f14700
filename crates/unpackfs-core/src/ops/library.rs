//! Operations resolved at runtime from the fakeroot preload library.

use std::ffi::CStr;
use std::ffi::CString;
use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_void;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::debug;

use super::FsOps;
use super::NODE_PERM;
use crate::ExtractionError;
use crate::Result;
use crate::types::Entry;
use crate::types::EntryKind;

/// Library the `library` provider loads under fakeroot.
pub const FAKEROOT_LIBRARY: &str = "libfakeroot-sysv.so";

#[cfg(target_arch = "x86")]
const MKNOD_VER_LINUX: c_int = 1;
#[cfg(not(target_arch = "x86"))]
const MKNOD_VER_LINUX: c_int = 0;

type ChmodFn = unsafe extern "C" fn(*const c_char, libc::mode_t) -> c_int;
type LchownFn = unsafe extern "C" fn(*const c_char, libc::uid_t, libc::gid_t) -> c_int;
type XmknodFn = unsafe extern "C" fn(c_int, *const c_char, libc::mode_t, *mut libc::dev_t) -> c_int;
type MknodFn = unsafe extern "C" fn(*const c_char, libc::mode_t, libc::dev_t) -> c_int;

#[derive(Clone, Copy)]
enum MknodSymbol {
    /// glibc before 2.33 exports only the versioned `__xmknod`.
    Versioned(XmknodFn),
    Plain(MknodFn),
}

/// Calls `chmod`, `lchown` and `mknod` through symbols looked up with
/// `dlopen`/`dlsym`, so that an interposing library (fakeroot) sees them
/// even when it is not preloaded into this process.
pub struct LibraryOps {
    handle: *mut c_void,
    library: String,
    chmod: ChmodFn,
    lchown: LchownFn,
    mknod: MknodSymbol,
}

impl std::fmt::Debug for LibraryOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryOps")
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

fn unavailable(reason: impl Into<String>) -> ExtractionError {
    ExtractionError::ProviderUnavailable {
        provider: "library",
        reason: reason.into(),
    }
}

#[allow(unsafe_code)]
fn last_dl_error() -> String {
    // SAFETY: dlerror() returns either NULL or a pointer to a NUL-terminated
    // string owned by the loader, valid until the next dl* call on this
    // thread. It is copied before any further dl* call.
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown dynamic loader error".to_string()
    } else {
        // SAFETY: non-null and NUL-terminated per the contract above.
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

#[allow(unsafe_code)]
fn symbol(handle: *mut c_void, name: &CStr) -> Option<*mut c_void> {
    // SAFETY: `handle` came from a successful dlopen() and has not been
    // closed; `name` is NUL-terminated.
    let ptr = unsafe { libc::dlsym(handle, name.as_ptr()) };
    (!ptr.is_null()).then_some(ptr)
}

fn c_path(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        ExtractionError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path contains null byte",
        ))
    })
}

fn check(operation: &'static str, path: &Path, rc: c_int) -> Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(ExtractionError::operation(
            operation,
            path,
            std::io::Error::last_os_error(),
        ))
    }
}

impl LibraryOps {
    /// Loads `library` and resolves `chmod`, `lchown` and `__xmknod`
    /// (or `mknod` where the versioned symbol does not exist).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::ProviderUnavailable`] if the library
    /// cannot be opened or lacks one of the symbols.
    #[allow(unsafe_code)]
    pub fn load_from(library: &str) -> Result<Self> {
        let name = CString::new(library).map_err(|_| unavailable("library name contains NUL"))?;

        // SAFETY: `name` is a valid NUL-terminated string that outlives the
        // call. Loading runs the library's constructors; fakeroot's only set
        // up its IPC state.
        let handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_LAZY) };
        if handle.is_null() {
            return Err(unavailable(format!("{library}: {}", last_dl_error())));
        }

        let resolve = |sym: &CStr| {
            symbol(handle, sym).ok_or_else(|| {
                unavailable(format!(
                    "{library}: symbol {} not found",
                    sym.to_string_lossy()
                ))
            })
        };

        let resolved = (|| -> Result<(ChmodFn, LchownFn, MknodSymbol)> {
            let chmod = resolve(c"chmod")?;
            let lchown = resolve(c"lchown")?;
            let mknod = match symbol(handle, c"__xmknod") {
                // SAFETY: __xmknod has had this signature in every glibc that
                // exports it.
                Some(ptr) => MknodSymbol::Versioned(unsafe {
                    std::mem::transmute::<*mut c_void, XmknodFn>(ptr)
                }),
                // SAFETY: POSIX mknod(const char *, mode_t, dev_t).
                None => MknodSymbol::Plain(unsafe {
                    std::mem::transmute::<*mut c_void, MknodFn>(resolve(c"mknod")?)
                }),
            };
            // SAFETY: both symbols are the libc functions of the same name,
            // whose C signatures match the pointer types.
            let (chmod, lchown) = unsafe {
                (
                    std::mem::transmute::<*mut c_void, ChmodFn>(chmod),
                    std::mem::transmute::<*mut c_void, LchownFn>(lchown),
                )
            };
            Ok((chmod, lchown, mknod))
        })();

        match resolved {
            Ok((chmod, lchown, mknod)) => {
                debug!(library, "resolved privileged operations");
                Ok(Self {
                    handle,
                    library: library.to_string(),
                    chmod,
                    lchown,
                    mknod,
                })
            }
            Err(e) => {
                // SAFETY: handle is open and nothing resolved from it escapes.
                unsafe { libc::dlclose(handle) };
                Err(e)
            }
        }
    }
}

impl FsOps for LibraryOps {
    fn name(&self) -> &'static str {
        "library"
    }

    #[allow(unsafe_code)]
    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        let cpath = c_path(path)?;
        // SAFETY: the symbol stays valid while `self.handle` is open, which
        // it is until drop; `cpath` outlives the call.
        let rc = unsafe { (self.chmod)(cpath.as_ptr(), mode as libc::mode_t) };
        check("chmod", path, rc)
    }

    #[allow(unsafe_code)]
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        let cpath = c_path(path)?;
        // SAFETY: as in chmod.
        let rc = unsafe { (self.lchown)(cpath.as_ptr(), uid, gid) };
        check("chown", path, rc)
    }

    #[allow(unsafe_code)]
    fn mknod(&self, path: &Path, entry: &Entry) -> Result<()> {
        if !matches!(
            entry.kind(),
            EntryKind::BlockDevice | EntryKind::CharDevice | EntryKind::Fifo
        ) {
            return Err(ExtractionError::operation(
                "mknod",
                path,
                format!("cannot create a {} node", entry.kind().name()),
            ));
        }
        let cpath = c_path(path)?;
        let mode = (entry.kind().type_bits() | NODE_PERM) as libc::mode_t;
        let dev = entry.device().unwrap_or_default();
        let mut raw_dev = libc::makedev(dev.major(), dev.minor());

        // SAFETY: as in chmod; `raw_dev` lives across the call.
        let rc = unsafe {
            match self.mknod {
                MknodSymbol::Versioned(xmknod) => {
                    xmknod(MKNOD_VER_LINUX, cpath.as_ptr(), mode, &raw mut raw_dev)
                }
                MknodSymbol::Plain(mknod) => mknod(cpath.as_ptr(), mode, raw_dev),
            }
        };
        check("mknod", path, rc)
    }
}

impl Drop for LibraryOps {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: handle was returned by dlopen and is closed exactly once.
        unsafe { libc::dlclose(self.handle) };
    }
}
