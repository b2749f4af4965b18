//! Userenv.dll bindings for per-user environment blocks

use crate::core::types::{TokenError, TokenResult};
use std::ffi::c_void;
use std::ptr;
use winapi::shared::minwindef::{FALSE, TRUE};
use winapi::um::userenv::{CreateEnvironmentBlock, DestroyEnvironmentBlock};
use winapi::um::winnt::HANDLE;

/// Build the environment block for a user token
///
/// The returned pointer is owned by the caller and must be passed to
/// [`destroy_environment_block`].
pub fn create_environment_block(token: HANDLE, inherit: bool) -> TokenResult<*mut c_void> {
    unsafe {
        let mut block: *mut winapi::ctypes::c_void = ptr::null_mut();
        let inherit = if inherit { TRUE } else { FALSE };
        if CreateEnvironmentBlock(&mut block, token, inherit) == FALSE {
            return Err(TokenError::native("CreateEnvironmentBlock", "token"));
        }
        Ok(block as *mut c_void)
    }
}

/// Release a block returned by [`create_environment_block`]
///
/// # Safety
/// The pointer must originate from `create_environment_block` and must not
/// be used afterwards.
pub unsafe fn destroy_environment_block(block: *mut c_void) {
    if !block.is_null() {
        // Ignore errors on cleanup
        DestroyEnvironmentBlock(block as *mut winapi::ctypes::c_void);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_destroy_null_is_noop() {
        unsafe {
            destroy_environment_block(ptr::null_mut());
        }
    }
}
