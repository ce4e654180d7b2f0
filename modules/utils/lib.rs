pub mod manifest;
pub mod section;
pub mod trailer;

pub use manifest::{CleanupPolicy, GateConfig, Manifest};

/// Magic section name for the embedded payload bundle in launcher binaries
pub const SECTION_NAME: &str = "c4rry0n";

/// Payload name of the program the launcher exists to run
pub const PASSENGER: &str = "passenger";

/// Payload name of the optional dependency installer
pub const PREREQUISITE: &str = "prerequisite";

#[derive(Debug, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct EmbeddedPayload {
    pub name: String,
    /// Declared length, checked against `bytes` when the payload is viewed
    pub len: u64,
    pub bytes: Vec<u8>,
}

/// Everything the packer embeds into a launcher stub
#[derive(Debug, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct PayloadBundle {
    pub manifest: Manifest,
    pub payloads: Vec<EmbeddedPayload>,
}

impl PayloadBundle {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            payloads: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.payloads.retain(|p| p.name != name);
        self.payloads.push(EmbeddedPayload {
            name: name.to_string(),
            len: bytes.len() as u64,
            bytes,
        });
        self
    }

    /// # Errors
    /// Returns an error if the bundle cannot be archived
    pub fn to_bytes(&self) -> Result<Vec<u8>, rkyv::rancor::Error> {
        Ok(rkyv::to_bytes::<rkyv::rancor::Error>(self)?.to_vec())
    }
}

/// Validates archived bundle bytes and returns a zero-copy view.
///
/// `bytes` must be aligned for the archive; callers copy section data into an
/// `rkyv::util::AlignedVec` first.
///
/// # Errors
/// Returns an error if the bytes are not a valid bundle archive
pub fn access_bundle(bytes: &[u8]) -> Result<&ArchivedPayloadBundle, rkyv::rancor::Error> {
    rkyv::access::<ArchivedPayloadBundle, rkyv::rancor::Error>(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use rkyv::util::AlignedVec;

    fn aligned(bytes: &[u8]) -> AlignedVec {
        let mut v = AlignedVec::new();
        v.extend_from_slice(bytes);
        v
    }

    #[test]
    fn test_bundle_lookup_by_name() {
        let bundle = PayloadBundle::new(Manifest::default())
            .with_payload(PASSENGER, b"passenger bytes".to_vec())
            .with_payload(PREREQUISITE, b"installer".to_vec());
        let bytes = aligned(&bundle.to_bytes().unwrap());

        let archived = access_bundle(&bytes).unwrap();
        let passenger = archived
            .payloads
            .iter()
            .find(|p| p.name.as_str() == PASSENGER)
            .unwrap();
        assert_eq!(passenger.bytes.as_slice(), b"passenger bytes");
        assert_eq!(passenger.len.to_native(), 15);
    }

    #[test]
    fn test_with_payload_replaces_existing_name() {
        let bundle = PayloadBundle::new(Manifest::default())
            .with_payload(PASSENGER, vec![1, 2, 3])
            .with_payload(PASSENGER, vec![4]);
        assert_eq!(bundle.payloads.len(), 1);
        assert_eq!(bundle.payloads[0].bytes, vec![4]);
    }

    #[test]
    fn test_access_rejects_garbage() {
        let bytes = aligned(&[0xff; 7]);
        assert!(access_bundle(&bytes).is_err());
    }
}
