//! Safe RAII wrappers for kernel handles used by this crate

use std::ptr;
use winapi::um::handleapi::CloseHandle;
use winapi::um::winnt::HANDLE;
use winapi::um::wtsapi32::WTSCloseServer;

/// Exclusively-owned access token handle
///
/// Closes the underlying handle exactly once, either on explicit
/// [`release`](AccessTokenHandle::release) or on drop. The invalid sentinel
/// owns nothing and every operation on it is a no-op.
pub struct AccessTokenHandle {
    handle: HANDLE,
}

impl AccessTokenHandle {
    /// Wrap a raw token handle, taking ownership
    pub fn new(handle: HANDLE) -> Self {
        AccessTokenHandle { handle }
    }

    /// The sentinel that owns no handle
    pub fn invalid() -> Self {
        AccessTokenHandle {
            handle: ptr::null_mut(),
        }
    }

    /// Whether this wrapper currently owns a handle
    pub fn is_invalid(&self) -> bool {
        self.handle.is_null()
    }

    /// Borrow the raw handle
    pub fn raw(&self) -> HANDLE {
        self.handle
    }

    /// Transfer ownership of the raw handle out, preventing cleanup
    pub fn into_raw(mut self) -> HANDLE {
        let handle = self.handle;
        self.handle = ptr::null_mut();
        handle
    }

    /// Close the handle now; safe to call more than once
    pub fn release(&mut self) {
        if !self.handle.is_null() {
            // Ignore errors on cleanup
            unsafe {
                CloseHandle(self.handle);
            }
            self.handle = ptr::null_mut();
        }
    }
}

impl Drop for AccessTokenHandle {
    fn drop(&mut self) {
        self.release();
    }
}

// Send + Sync are safe because HANDLEs are process-local
unsafe impl Send for AccessTokenHandle {}
unsafe impl Sync for AccessTokenHandle {}

/// Owned process handle with the same cleanup contract
pub struct ProcessHandle {
    handle: HANDLE,
}

impl ProcessHandle {
    pub fn new(handle: HANDLE) -> Self {
        ProcessHandle { handle }
    }

    pub fn raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                CloseHandle(self.handle);
            }
        }
    }
}

unsafe impl Send for ProcessHandle {}
unsafe impl Sync for ProcessHandle {}

/// Handle to a WTS server, local or remote
///
/// The local pseudo-handle is a null HANDLE by contract and is never closed.
pub struct WtsServerHandle {
    handle: HANDLE,
    owned: bool,
}

impl WtsServerHandle {
    /// The pseudo-handle addressing the local server
    pub fn local() -> Self {
        WtsServerHandle {
            handle: ptr::null_mut(),
            owned: false,
        }
    }

    /// Wrap a handle returned by WTSOpenServerW
    pub fn from_raw(handle: HANDLE) -> Self {
        WtsServerHandle {
            handle,
            owned: true,
        }
    }

    pub fn raw(&self) -> HANDLE {
        self.handle
    }

    /// Whether this addresses the local server
    pub fn is_local(&self) -> bool {
        self.handle.is_null()
    }
}

impl Drop for WtsServerHandle {
    fn drop(&mut self) {
        if self.owned && !self.handle.is_null() {
            unsafe {
                WTSCloseServer(self.handle);
            }
        }
    }
}

unsafe impl Send for WtsServerHandle {}
unsafe impl Sync for WtsServerHandle {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_token_handle() {
        let handle = AccessTokenHandle::invalid();
        assert!(handle.is_invalid());
        assert_eq!(handle.raw(), ptr::null_mut());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut handle = AccessTokenHandle::invalid();
        handle.release();
        handle.release();
        assert!(handle.is_invalid());
    }

    #[test]
    fn test_into_raw_prevents_cleanup() {
        let handle = AccessTokenHandle::new(ptr::null_mut());
        let raw = handle.into_raw();
        assert_eq!(raw, ptr::null_mut());
    }

    #[test]
    fn test_token_handle_drop() {
        {
            let _handle = AccessTokenHandle::invalid();
        }
        // Should not crash
    }

    #[test]
    fn test_local_server_handle() {
        let server = WtsServerHandle::local();
        assert!(server.is_local());
        assert_eq!(server.raw(), ptr::null_mut());
    }

    #[test]
    fn test_local_server_drop_closes_nothing() {
        {
            let _server = WtsServerHandle::local();
        }
        // Should not crash
    }
}
