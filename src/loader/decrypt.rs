use std::fmt::Debug;

use super::types::LoadError;

/// Hook applied to every file right after it is read and before anything parses it.
pub trait Decryptor: Send + Sync + Debug {
    fn decrypt(&self, data: Vec<u8>) -> Result<Vec<u8>, LoadError>;
}

/// Leaves the data untouched. Used for plain model files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Decryptor for Passthrough {
    fn decrypt(&self, data: Vec<u8>) -> Result<Vec<u8>, LoadError> {
        Ok(data)
    }
}

/// Repeating-key XOR obfuscation. Applying it twice restores the input.
#[derive(Clone)]
pub struct XorDecryptor {
    key: Vec<u8>,
}

impl XorDecryptor {
    pub fn new(key: Vec<u8>) -> Result<Self, LoadError> {
        if key.is_empty() {
            return Err(LoadError::Decrypt("XOR key must not be empty".into()));
        }
        Ok(Self { key })
    }

    /// Builds the decryptor from a hex string such as `"5a17c3"`.
    pub fn from_hex(hex: &str) -> Result<Self, LoadError> {
        let hex = hex.trim();
        if hex.len() % 2 != 0 {
            return Err(LoadError::Decrypt(format!(
                "XOR key '{}' has an odd number of digits",
                hex
            )));
        }
        let key = (0..hex.len())
            .step_by(2)
            .map(|i| {
                hex.get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| {
                        LoadError::Decrypt(format!("XOR key '{}' is not valid hex", hex))
                    })
            })
            .collect::<Result<Vec<u8>, LoadError>>()?;
        Self::new(key)
    }
}

impl Debug for XorDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print key material
        write!(f, "XorDecryptor {{ key_len: {} }}", self.key.len())
    }
}

impl Decryptor for XorDecryptor {
    fn decrypt(&self, mut data: Vec<u8>) -> Result<Vec<u8>, LoadError> {
        for (byte, k) in data.iter_mut().zip(self.key.iter().cycle()) {
            *byte ^= k;
        }
        Ok(data)
    }
}

/// Picks the decryptor for an optional hex key.
pub fn decryptor_for(key: Option<&str>) -> Result<Box<dyn Decryptor>, LoadError> {
    match key {
        Some(hex) => Ok(Box::new(XorDecryptor::from_hex(hex)?)),
        None => Ok(Box::new(Passthrough)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_is_identity() {
        let data = b"<net/>".to_vec();
        assert_eq!(Passthrough.decrypt(data.clone()).unwrap(), data);
    }

    #[test]
    fn test_xor_twice_restores_input() {
        let xor = XorDecryptor::from_hex("a5ff01").unwrap();
        let plain = b"graph description text".to_vec();
        let sealed = xor.decrypt(plain.clone()).unwrap();
        assert_ne!(sealed, plain);
        assert_eq!(xor.decrypt(sealed).unwrap(), plain);
    }

    #[test]
    fn test_bad_keys_are_rejected() {
        assert!(XorDecryptor::from_hex("").is_err());
        assert!(XorDecryptor::from_hex("abc").is_err());
        assert!(XorDecryptor::from_hex("zz").is_err());
        assert!(XorDecryptor::new(Vec::new()).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let xor = XorDecryptor::from_hex("deadbeef").unwrap();
        let shown = format!("{:?}", xor);
        assert!(!shown.to_lowercase().contains("deadbeef"));
        assert!(shown.contains("key_len: 4"));
    }
}
