//! Windows utility functions

pub mod string_conv;

// Re-export commonly used utilities
pub use string_conv::{string_to_wide, wide_ptr_to_string, wide_to_string};

#[cfg(test)]
mod tests {
    #[test]
    fn test_utils_available() {
        // Utils should be available - compile-time test
    }
}
