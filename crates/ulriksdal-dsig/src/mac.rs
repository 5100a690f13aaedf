#![forbid(unsafe_code)]

//! HMAC signature methods.

use hmac::{Hmac, Mac};
use ulriksdal_core::{algorithm, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    HmacSha1,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl SignatureMethod {
    pub fn from_uri(uri: &str) -> Result<Self> {
        match uri {
            algorithm::HMAC_SHA1 => Ok(Self::HmacSha1),
            algorithm::HMAC_SHA256 => Ok(Self::HmacSha256),
            algorithm::HMAC_SHA384 => Ok(Self::HmacSha384),
            algorithm::HMAC_SHA512 => Ok(Self::HmacSha512),
            _ => Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Self::HmacSha1 => algorithm::HMAC_SHA1,
            Self::HmacSha256 => algorithm::HMAC_SHA256,
            Self::HmacSha384 => algorithm::HMAC_SHA384,
            Self::HmacSha512 => algorithm::HMAC_SHA512,
        }
    }

    pub fn sign(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        Ok(match self {
            Self::HmacSha1 => keyed::<Hmac<sha1::Sha1>>(key, data)?.finalize().into_bytes().to_vec(),
            Self::HmacSha256 => keyed::<Hmac<sha2::Sha256>>(key, data)?.finalize().into_bytes().to_vec(),
            Self::HmacSha384 => keyed::<Hmac<sha2::Sha384>>(key, data)?.finalize().into_bytes().to_vec(),
            Self::HmacSha512 => keyed::<Hmac<sha2::Sha512>>(key, data)?.finalize().into_bytes().to_vec(),
        })
    }

    /// Constant-time check of `signature` against the MAC of `data`.
    /// Truncated MACs are rejected.
    pub fn verify(self, key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool> {
        Ok(match self {
            Self::HmacSha1 => keyed::<Hmac<sha1::Sha1>>(key, data)?.verify_slice(signature).is_ok(),
            Self::HmacSha256 => keyed::<Hmac<sha2::Sha256>>(key, data)?.verify_slice(signature).is_ok(),
            Self::HmacSha384 => keyed::<Hmac<sha2::Sha384>>(key, data)?.verify_slice(signature).is_ok(),
            Self::HmacSha512 => keyed::<Hmac<sha2::Sha512>>(key, data)?.verify_slice(signature).is_ok(),
        })
    }
}

fn keyed<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<M> {
    if key.is_empty() {
        return Err(Error::Key("empty HMAC key".into()));
    }
    let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(key)
        .map_err(|e| Error::Key(format!("HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_hmac_sha256_known_value() {
        let mac = SignatureMethod::HmacSha256
            .sign(b"Jefe", b"what do ya want for nothing?")
            .unwrap();
        assert_eq!(
            hex(&mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_rejects_tampering_and_truncation() {
        let method = SignatureMethod::HmacSha512;
        let mac = method.sign(b"secret", b"data").unwrap();
        assert!(method.verify(b"secret", b"data", &mac).unwrap());
        assert!(!method.verify(b"secret", b"date", &mac).unwrap());
        assert!(!method.verify(b"other", b"data", &mac).unwrap());
        assert!(!method.verify(b"secret", b"data", &mac[..32]).unwrap());
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            SignatureMethod::HmacSha1.sign(b"", b"data"),
            Err(Error::Key(_))
        ));
    }
}
