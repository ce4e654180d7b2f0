//! Payload store over the launcher's own image.

use crate::error::{LaunchError, sites};
use rkyv::util::AlignedVec;
use utils::{ArchivedEmbeddedPayload, Manifest, SECTION_NAME};

/// Handle to the payload bundle embedded in an executable image.
///
/// The bundle section is copied once into aligned storage so the archive can
/// be read in place; every [`Payload`] borrows from this value.
pub struct Image {
    bundle: Option<AlignedVec>,
}

impl Image {
    /// Loads the bundle embedded in the running executable. An executable
    /// without the section yields an empty image, in which every payload
    /// lookup fails with `ResourceNotFound`.
    pub fn current() -> Self {
        match find_embedded() {
            Ok(Some(image)) => image,
            Ok(None) => {
                log::debug!("no {SECTION_NAME} section in this executable");
                Self::empty()
            }
            Err(err) => {
                log::warn!("failed to read embedded section: {err}");
                Self::empty()
            }
        }
    }

    pub fn from_bundle(bytes: &[u8]) -> Self {
        let mut bundle = AlignedVec::new();
        bundle.extend_from_slice(bytes);
        Self {
            bundle: Some(bundle),
        }
    }

    pub fn empty() -> Self {
        Self { bundle: None }
    }

    fn archive(&self) -> Result<Option<&utils::ArchivedPayloadBundle>, LaunchError> {
        let Some(bytes) = &self.bundle else {
            return Ok(None);
        };
        utils::access_bundle(bytes)
            .map(Some)
            .map_err(|e| LaunchError::detail(sites::LOAD_PAYLOAD, e))
    }

    /// The launcher configuration embedded with the payloads.
    ///
    /// # Errors
    /// Returns an error if the image has no valid bundle
    pub fn manifest(&self) -> Result<Manifest, LaunchError> {
        let Some(archived) = self.archive()? else {
            return Err(LaunchError::detail(sites::FIND_PAYLOAD, "no embedded bundle"));
        };
        rkyv::deserialize::<Manifest, rkyv::rancor::Error>(&archived.manifest)
            .map_err(|e| LaunchError::detail(sites::LOAD_PAYLOAD, e))
    }
}

// libsui's ELF lookup expects its footer at end-of-file, where the parameter
// trailer sits instead.
#[cfg(all(unix, not(target_vendor = "apple")))]
fn find_embedded() -> std::io::Result<Option<Image>> {
    let file = std::fs::read(std::env::current_exe()?)?;
    Ok(utils::section::appended_section(&file, SECTION_NAME).map(Image::from_bundle))
}

#[cfg(not(all(unix, not(target_vendor = "apple"))))]
fn find_embedded() -> std::io::Result<Option<Image>> {
    Ok(libsui::find_section(SECTION_NAME)?.map(Image::from_bundle))
}

/// A located, not yet viewed payload.
pub struct PayloadHandle<'img> {
    name: String,
    entry: &'img ArchivedEmbeddedPayload,
}

impl PayloadHandle<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An acquired payload: a read-only view into the image.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'img> {
    name: &'img str,
    bytes: &'img [u8],
}

impl<'img> Payload<'img> {
    pub fn name(&self) -> &'img str {
        self.name
    }

    pub fn bytes(&self) -> &'img [u8] {
        self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Read-only store of the payloads embedded in an [`Image`].
pub struct PayloadStore<'img> {
    image: &'img Image,
}

impl<'img> PayloadStore<'img> {
    pub fn new(image: &'img Image) -> Self {
        Self { image }
    }

    /// # Errors
    /// `ResourceNotFound` if no payload named `name` is embedded,
    /// `ResourceLockFailed` if the bundle itself is invalid
    pub fn open(&self, name: &str) -> Result<PayloadHandle<'img>, LaunchError> {
        let entry = self
            .image
            .archive()?
            .and_then(|bundle| bundle.payloads.iter().find(|p| p.name.as_str() == name))
            .ok_or_else(|| {
                LaunchError::detail(sites::FIND_PAYLOAD, format!("no payload named '{name}'"))
            })?;
        Ok(PayloadHandle {
            name: name.to_string(),
            entry,
        })
    }

    /// # Errors
    /// `ResourceSizeUnavailable` if the payload declares no bytes
    pub fn size(&self, handle: &PayloadHandle<'img>) -> Result<u64, LaunchError> {
        let len = handle.entry.len.to_native();
        if len == 0 {
            return Err(LaunchError::detail(
                sites::PAYLOAD_SIZE,
                format!("payload '{}' is empty", handle.name),
            ));
        }
        Ok(len)
    }

    /// # Errors
    /// `ResourceLockFailed` if the stored bytes disagree with the declared size
    pub fn view(&self, handle: &PayloadHandle<'img>) -> Result<&'img [u8], LaunchError> {
        let bytes = handle.entry.bytes.as_slice();
        if bytes.len() as u64 != handle.entry.len.to_native() {
            return Err(LaunchError::detail(
                sites::LOCK_PAYLOAD,
                format!(
                    "payload '{}' holds {} bytes but declares {}",
                    handle.name,
                    bytes.len(),
                    handle.entry.len.to_native()
                ),
            ));
        }
        Ok(bytes)
    }

    /// Open, size and view `name` in one step.
    ///
    /// # Errors
    /// Returns the first failing step's error
    pub fn acquire(&self, name: &str) -> Result<Payload<'img>, LaunchError> {
        let handle = self.open(name)?;
        let size = self.size(&handle)?;
        let bytes = self.view(&handle)?;
        log::debug!("acquired payload '{name}' ({size} bytes)");
        Ok(Payload {
            name: handle.entry.name.as_str(),
            bytes,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use utils::{EmbeddedPayload, PASSENGER, PREREQUISITE, PayloadBundle};

    fn image_with(bundle: &PayloadBundle) -> Image {
        Image::from_bundle(&bundle.to_bytes().unwrap())
    }

    #[test]
    fn test_acquire_returns_view_of_payload() {
        let image = image_with(
            &PayloadBundle::new(Manifest::default()).with_payload(PASSENGER, b"MZ-body".to_vec()),
        );
        let store = PayloadStore::new(&image);
        let payload = store.acquire(PASSENGER).unwrap();
        assert_eq!(payload.name(), PASSENGER);
        assert_eq!(payload.bytes(), b"MZ-body");
        assert_eq!(payload.size(), 7);
    }

    #[test]
    fn test_missing_payload_is_not_found() {
        let image = image_with(
            &PayloadBundle::new(Manifest::default()).with_payload(PASSENGER, vec![1]),
        );
        let store = PayloadStore::new(&image);
        let err = store.open(PREREQUISITE).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_empty_image_is_not_found() {
        let image = Image::empty();
        let err = PayloadStore::new(&image).acquire(PASSENGER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert!(image.manifest().is_err());
    }

    #[test]
    fn test_zero_length_payload_has_no_size() {
        let image =
            image_with(&PayloadBundle::new(Manifest::default()).with_payload(PASSENGER, vec![]));
        let err = PayloadStore::new(&image).acquire(PASSENGER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceSizeUnavailable);
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_length_mismatch_fails_to_lock() {
        let mut bundle = PayloadBundle::new(Manifest::default());
        bundle.payloads.push(EmbeddedPayload {
            name: PASSENGER.to_string(),
            len: 10,
            bytes: vec![0; 4],
        });
        let image = image_with(&bundle);
        let err = PayloadStore::new(&image).acquire(PASSENGER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceLockFailed);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_corrupt_bundle_fails_to_load() {
        let image = Image::from_bundle(&[0xAB; 5]);
        let err = PayloadStore::new(&image).open(PASSENGER).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ResourceLockFailed);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_manifest_round_trips_through_image() {
        let manifest = Manifest {
            prerequisite_args: "/passive".to_string(),
            ..Manifest::default()
        };
        let bundle = PayloadBundle::new(manifest.clone()).with_payload(PASSENGER, vec![1]);
        let image = image_with(&bundle);
        assert_eq!(image.manifest().unwrap(), manifest);
    }
}
