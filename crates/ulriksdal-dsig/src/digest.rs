#![forbid(unsafe_code)]

//! Digest methods.

use digest::Digest;
use ulriksdal_core::{algorithm, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestMethod {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestMethod {
    pub fn from_uri(uri: &str) -> Result<Self> {
        match uri {
            algorithm::SHA1 => Ok(Self::Sha1),
            algorithm::SHA256 => Ok(Self::Sha256),
            algorithm::SHA384 => Ok(Self::Sha384),
            algorithm::SHA512 => Ok(Self::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(format!("digest algorithm: {uri}"))),
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => sha1::Sha1::digest(data).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

/// Compute a digest in one shot.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>> {
    Ok(DigestMethod::from_uri(uri)?.digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    #[test]
    fn test_sha256_known_value() {
        let out = digest(algorithm::SHA256, b"abc").unwrap();
        assert_eq!(
            base64::engine::general_purpose::STANDARD.encode(out),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[test]
    fn test_output_lengths() {
        for (uri, len) in [
            (algorithm::SHA1, 20),
            (algorithm::SHA256, 32),
            (algorithm::SHA384, 48),
            (algorithm::SHA512, 64),
        ] {
            assert_eq!(digest(uri, b"x").unwrap().len(), len);
        }
    }

    #[test]
    fn test_unknown_uri() {
        assert!(matches!(
            DigestMethod::from_uri("urn:md5"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
