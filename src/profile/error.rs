/// Errors that can occur while building or decoding a spectral profile
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Profile without any value
    #[error("Profile has no values")]
    Empty,

    /// A per-band sequence does not match the band count
    #[error("Length mismatch: {axis} has {actual} entries, expected {expected}")]
    LengthMismatch {
        /// Name of the offending sequence (`wavelengths`, `fwhm`, `bad_bands`)
        axis: &'static str,
        /// Band count of the profile
        expected: usize,
        /// Length of the offending sequence
        actual: usize,
    },

    /// Serialized profile is not valid JSON or misses the `y` values
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
