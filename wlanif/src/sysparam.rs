/// Persisted system parameters (key/value store).
///
/// Only string lookup is needed by the interface glue. The real store lives
/// in flash and belongs to the platform; `MemSysParams` is an in-memory
/// store for hosts and tests.
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Key the interface hostname is stored under.
pub const HOSTNAME_KEY: &str = "hostname";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysParamError {
    /// Store not mounted yet.
    NotInitialized,
    /// Value exists but is not a string.
    ParseFailed,
    /// Backing storage failed.
    Io,
}

impl core::fmt::Display for SysParamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SysParamError::NotInitialized => write!(f, "sysparam store not initialized"),
            SysParamError::ParseFailed => write!(f, "sysparam value is not a string"),
            SysParamError::Io => write!(f, "sysparam storage I/O error"),
        }
    }
}

/// Read access to persisted parameters.
pub trait SysParams {
    /// `Ok(None)` when the key is absent.
    fn get_string(&self, key: &str) -> Result<Option<String>, SysParamError>;
}

enum Value {
    Str(String),
    Bin(Vec<u8>),
}

/// In-memory parameter store.
#[derive(Default)]
pub struct MemSysParams {
    values: BTreeMap<String, Value>,
}

impl MemSysParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.values.insert(key.into(), Value::Str(value.into()));
    }

    pub fn set_binary(&mut self, key: &str, value: &[u8]) {
        self.values.insert(key.into(), Value::Bin(value.to_vec()));
    }

    /// Raw bytes stored with `set_binary`; `None` for absent or string keys.
    pub fn get_binary(&self, key: &str) -> Option<&[u8]> {
        match self.values.get(key) {
            Some(Value::Bin(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }
}

impl SysParams for MemSysParams {
    fn get_string(&self, key: &str) -> Result<Option<String>, SysParamError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(Value::Bin(_)) => Err(SysParamError::ParseFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_value_is_not_a_string() {
        let mut params = MemSysParams::new();
        params.set_binary(HOSTNAME_KEY, &[0xDE, 0xAD]);

        assert_eq!(params.get_string(HOSTNAME_KEY), Err(SysParamError::ParseFailed));
        assert_eq!(params.get_binary(HOSTNAME_KEY), Some(&[0xDE, 0xAD][..]));
    }

    #[test]
    fn string_value_has_no_binary_form() {
        let mut params = MemSysParams::new();
        params.set_string(HOSTNAME_KEY, "esp-node");

        assert_eq!(params.get_binary(HOSTNAME_KEY), None);
        assert!(params.remove(HOSTNAME_KEY));
        assert_eq!(params.get_string(HOSTNAME_KEY), Ok(None));
    }
}
