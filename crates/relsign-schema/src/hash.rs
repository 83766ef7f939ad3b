//! SHA-256 digests as written to checksum sidecars.

/// A SHA256 digest rendered as 64 lowercase hex characters.
///
/// Every digest written to a checksum sidecar goes through this type, so a
/// sidecar can never carry a truncated or mixed-case value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Build a digest from raw hash output.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render one `sha256sum -c` compatible line: `<hex>  <file_name>\n`.
    ///
    /// `file_name` should be a bare file name so the check works once the
    /// artifact and its sidecar are downloaded into the same directory.
    pub fn checksum_line(&self, file_name: &str) -> String {
        format!("{}  {file_name}\n", self.0)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn empty_digest() -> Sha256Digest {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(EMPTY_SHA256, &mut bytes).unwrap();
        Sha256Digest::from_bytes(bytes)
    }

    #[test]
    fn renders_lowercase_hex() {
        let d = Sha256Digest::from_bytes([0xAB; 32]);
        assert_eq!(d.as_str(), "ab".repeat(32));
        assert_eq!(d.to_string(), d.as_str());
    }

    #[test]
    fn checksum_line_uses_two_spaces() {
        assert_eq!(
            empty_digest().checksum_line("go1.23.3.linux-amd64.tar.gz"),
            format!("{EMPTY_SHA256}  go1.23.3.linux-amd64.tar.gz\n")
        );
    }
}
