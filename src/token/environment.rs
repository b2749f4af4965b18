//! Per-user environment blocks
//!
//! Wraps the userenv block in an owned type, with pure conversion between
//! the double-NUL-terminated UTF-16 layout and a sorted map.

use crate::core::types::TokenResult;
use crate::windows::bindings::userenv;
use crate::windows::types::AccessTokenHandle;
use std::collections::BTreeMap;
use std::ffi::c_void;
use std::ptr;

/// An environment block in the layout CreateProcess expects
///
/// Either allocated by the OS for a token or rebuilt locally after a merge.
pub struct EnvironmentBlock {
    system: *mut c_void,
    owned: Option<Vec<u16>>,
}

impl EnvironmentBlock {
    fn from_system(block: *mut c_void) -> Self {
        EnvironmentBlock {
            system: block,
            owned: None,
        }
    }

    fn from_owned(units: Vec<u16>) -> Self {
        EnvironmentBlock {
            system: ptr::null_mut(),
            owned: Some(units),
        }
    }

    /// Pointer suitable for the lpEnvironment argument of CreateProcessW
    pub fn as_ptr(&self) -> *const c_void {
        match &self.owned {
            Some(units) => units.as_ptr() as *const c_void,
            None => self.system as *const c_void,
        }
    }

    /// Decode the block into a sorted variable map
    pub fn to_map(&self) -> BTreeMap<String, String> {
        match &self.owned {
            Some(units) => parse_block(units),
            None => unsafe { parse_block(&copy_units(self.system)) },
        }
    }
}

impl Drop for EnvironmentBlock {
    fn drop(&mut self) {
        if !self.system.is_null() {
            unsafe {
                userenv::destroy_environment_block(self.system);
            }
        }
    }
}

unsafe impl Send for EnvironmentBlock {}

/// Build the environment block for a user token
pub fn create_environment_block(
    token: &AccessTokenHandle,
    inherit: bool,
) -> TokenResult<EnvironmentBlock> {
    let block = userenv::create_environment_block(token.raw(), inherit)?;
    Ok(EnvironmentBlock::from_system(block))
}

/// Build the block for a token, then overlay additional variables
///
/// Extra variables replace same-named ones from the token's block.
pub fn create_environment_block_with(
    token: &AccessTokenHandle,
    extra: &BTreeMap<String, String>,
    inherit: bool,
) -> TokenResult<EnvironmentBlock> {
    let base = create_environment_block(token, inherit)?;
    let mut map = base.to_map();
    for (key, value) in extra {
        map.insert(key.clone(), value.clone());
    }
    Ok(EnvironmentBlock::from_owned(build_block(&map)))
}

/// Decode `NAME=value\0...\0\0` UTF-16 units into a map
///
/// Drive-letter entries like `=C:=C:\` keep their leading `=` in the key,
/// matching how the OS stores them.
pub fn parse_block(units: &[u16]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let mut start = 0;
    for (index, &unit) in units.iter().enumerate() {
        if unit != 0 {
            continue;
        }
        if index == start {
            break; // double terminator
        }
        let entry = String::from_utf16_lossy(&units[start..index]);
        start = index + 1;

        // The separator search skips position 0 for '='-prefixed names
        let split = entry
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '=')
            .map(|(index, _)| index);
        match split {
            Some(position) => {
                let (key, value) = entry.split_at(position);
                map.insert(key.to_string(), value[1..].to_string());
            }
            None => {
                map.insert(entry, String::new());
            }
        }
    }
    map
}

/// Encode a variable map back into block layout
pub fn build_block(map: &BTreeMap<String, String>) -> Vec<u16> {
    let mut units = Vec::new();
    for (key, value) in map {
        units.extend(key.encode_utf16());
        units.push('=' as u16);
        units.extend(value.encode_utf16());
        units.push(0);
    }
    if map.is_empty() {
        units.push(0);
    }
    units.push(0);
    units
}

unsafe fn copy_units(block: *mut c_void) -> Vec<u16> {
    let mut units = Vec::new();
    if block.is_null() {
        return units;
    }
    let mut cursor = block as *const u16;
    loop {
        let unit = *cursor;
        units.push(unit);
        if unit == 0 && *cursor.add(1) == 0 {
            units.push(0);
            break;
        }
        cursor = cursor.add(1);
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block_of(entries: &[&str]) -> Vec<u16> {
        let mut units = Vec::new();
        for entry in entries {
            units.extend(entry.encode_utf16());
            units.push(0);
        }
        units.push(0);
        units
    }

    #[test]
    fn test_parse_simple_block() {
        let units = block_of(&["PATH=C:\\Windows", "TEMP=C:\\Temp"]);
        let map = parse_block(&units);
        assert_eq!(map.len(), 2);
        assert_eq!(map["PATH"], "C:\\Windows");
        assert_eq!(map["TEMP"], "C:\\Temp");
    }

    #[test]
    fn test_parse_drive_letter_entry() {
        let units = block_of(&["=C:=C:\\Users\\alice"]);
        let map = parse_block(&units);
        assert_eq!(map["=C:"], "C:\\Users\\alice");
    }

    #[test]
    fn test_parse_value_with_equals() {
        let units = block_of(&["FLAGS=a=b=c"]);
        let map = parse_block(&units);
        assert_eq!(map["FLAGS"], "a=b=c");
    }

    #[test]
    fn test_parse_empty_block() {
        assert!(parse_block(&[0, 0]).is_empty());
        assert!(parse_block(&[]).is_empty());
    }

    #[test]
    fn test_build_then_parse() {
        let mut map = BTreeMap::new();
        map.insert("ALPHA".to_string(), "1".to_string());
        map.insert("BETA".to_string(), "two words".to_string());
        let units = build_block(&map);
        assert_eq!(parse_block(&units), map);
    }

    #[test]
    fn test_build_empty_map() {
        // An entry-less block is still double-terminated
        assert_eq!(build_block(&BTreeMap::new()), vec![0, 0]);
    }

    #[test]
    fn test_owned_block_round_trip() {
        let mut map = BTreeMap::new();
        map.insert("X".to_string(), "y".to_string());
        let block = EnvironmentBlock::from_owned(build_block(&map));
        assert_eq!(block.to_map(), map);
        assert!(!block.as_ptr().is_null());
    }
}
