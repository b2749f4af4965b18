//! Windows-specific type definitions and wrappers

pub mod handle;

// Re-export commonly used types
pub use handle::{AccessTokenHandle, ProcessHandle, WtsServerHandle};

#[cfg(test)]
mod tests {
    #[test]
    fn test_types_available() {
        // Types should be available - compile-time test
    }
}
