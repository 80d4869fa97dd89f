//! LC-3 object-image file format.
//!
//! A `.obj` image is a sequence of big-endian 16-bit words: the first is
//! the origin (the load address, which also becomes the initial PC), the
//! rest are the program words placed there in order.

use std::path::Path;
use thiserror::Error;

/// A loaded object image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjFile {
    /// Load address of the first program word.
    pub origin: u16,
    /// The program words.
    pub words: Vec<u16>,
}

impl ObjFile {
    /// Create an empty image at the given origin.
    pub fn new(origin: u16) -> Self {
        Self {
            origin,
            words: Vec::new(),
        }
    }

    /// Append a program word.
    pub fn push(&mut self, word: u16) {
        self.words.push(word);
    }

    /// Get the number of program words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the image has no program words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Parse an image from its on-disk byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ObjError> {
        if bytes.len() < 2 {
            return Err(ObjError::Truncated(bytes.len()));
        }
        if bytes.len() % 2 != 0 {
            return Err(ObjError::OddLength(bytes.len()));
        }

        let origin = u16::from_be_bytes([bytes[0], bytes[1]]);
        let words = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self { origin, words })
    }

    /// Serialize the image to its on-disk byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + 2 * self.words.len());
        bytes.extend_from_slice(&self.origin.to_be_bytes());
        for word in &self.words {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        bytes
    }
}

/// Load an object image from disk.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<ObjFile, ObjError> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| ObjError::Io(e.to_string()))?;
    ObjFile::from_bytes(&bytes)
}

/// Save an object image to disk.
pub fn save_obj<P: AsRef<Path>>(path: P, obj: &ObjFile) -> Result<(), ObjError> {
    std::fs::write(path.as_ref(), obj.to_bytes()).map_err(|e| ObjError::Io(e.to_string()))
}

/// Errors that can occur during object-image operations.
#[derive(Debug, Clone, Error)]
pub enum ObjError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("image truncated: {0} bytes is too short for an origin word")]
    Truncated(usize),

    #[error("image has odd length {0}, expected whole 16-bit words")]
    OddLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image() {
        let obj = ObjFile::from_bytes(&[0x30, 0x00, 0x12, 0x34, 0xF0, 0x25]).unwrap();

        assert_eq!(obj.origin, 0x3000);
        assert_eq!(obj.words, vec![0x1234, 0xF025]);
    }

    #[test]
    fn test_origin_only_image() {
        let obj = ObjFile::from_bytes(&[0x30, 0x00]).unwrap();

        assert_eq!(obj.origin, 0x3000);
        assert!(obj.is_empty());
    }

    #[test]
    fn test_byte_roundtrip() {
        let mut obj = ObjFile::new(0x3000);
        obj.push(0x1021);
        obj.push(0xF025);

        assert_eq!(ObjFile::from_bytes(&obj.to_bytes()).unwrap(), obj);
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(ObjFile::from_bytes(&[]), Err(ObjError::Truncated(0))));
        assert!(matches!(ObjFile::from_bytes(&[0x30]), Err(ObjError::Truncated(1))));
    }

    #[test]
    fn test_odd_length() {
        assert!(matches!(
            ObjFile::from_bytes(&[0x30, 0x00, 0x12]),
            Err(ObjError::OddLength(3))
        ));
    }
}
