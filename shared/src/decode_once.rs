use std::sync::OnceLock;

/// A decode-once memoized cell over a serialized wire field.
///
/// The serialized form is kept verbatim; the decoded form is produced at most
/// once, on first access, behind a compare-and-set guard. Concurrent callers
/// may race to decode, but exactly one result is ever published and all
/// callers observe the same value.
#[derive(Debug)]
pub struct DecodeOnce<T> {
    encoded: Vec<u8>,
    decoded: OnceLock<T>,
}

impl<T> DecodeOnce<T> {
    pub fn new(encoded: Vec<u8>) -> Self {
        Self {
            encoded,
            decoded: OnceLock::new(),
        }
    }

    /// The serialized form, unchanged from the wire.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Whether a decoded value has been published yet.
    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    /// Returns the decoded value, running `decode` on first access.
    ///
    /// A failed decode publishes nothing; a later call may retry.
    pub fn get_or_decode<E>(
        &self,
        decode: impl FnOnce(&[u8]) -> Result<T, E>,
    ) -> Result<&T, E> {
        if let Some(value) = self.decoded.get() {
            return Ok(value);
        }
        let value = decode(&self.encoded)?;
        Ok(self.decoded.get_or_init(|| value))
    }
}
