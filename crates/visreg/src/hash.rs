//! Perceptual hashing (pHash).
//!
//! Built on `image_hasher`: the image is reduced to grayscale, downsampled,
//! transformed with a 2D DCT, and the `n x n` lowest-frequency coefficients
//! are thresholded against their median. Visually similar images land a
//! small Hamming distance apart.
//!
//! Hashes are a cheap prefilter; they never replace the pixel diff in a
//! match decision unless the caller opts in.

use crate::config::{DEFAULT_HASH_SIZE, MAX_HASH_SIZE};
use crate::result::{VisregError, VisregResult};
use image::imageops::FilterType;
use image::RgbaImage;
use image_hasher::{HashAlg, Hasher, HasherConfig, ImageHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-length perceptual fingerprint of an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "HexHash", try_from = "HexHash")]
pub struct PerceptualHash {
    hash_size: u32,
    hash: ImageHash,
}

impl PerceptualHash {
    /// Side length of the hash grid
    #[must_use]
    pub const fn hash_size(&self) -> u32 {
        self.hash_size
    }

    /// Number of bits (`hash_size²`)
    #[must_use]
    pub const fn bit_len(&self) -> u32 {
        self.hash_size * self.hash_size
    }

    /// Packed hash bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.hash.as_bytes()
    }

    /// Count of differing bits.
    ///
    /// # Errors
    ///
    /// Returns [`VisregError::HashSizeMismatch`] if the hashes were computed
    /// with different sizes.
    pub fn hamming_distance(&self, other: &Self) -> VisregResult<u32> {
        if self.hash_size != other.hash_size {
            return Err(VisregError::HashSizeMismatch {
                left: self.hash_size,
                right: other.hash_size,
            });
        }
        Ok(self.hash.dist(&other.hash))
    }

    /// `1 - distance / bits`, in `[0, 1]`.
    pub fn similarity(&self, other: &Self) -> VisregResult<f64> {
        let distance = self.hamming_distance(other)?;
        Ok(1.0 - f64::from(distance) / f64::from(self.bit_len()))
    }

    /// Lowercase hex of the packed bytes, two digits per byte.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.as_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a hash previously rendered with [`to_hex`](Self::to_hex).
    ///
    /// # Errors
    ///
    /// Returns [`VisregError::InvalidArgument`] for malformed hex or a byte
    /// count that does not fit `hash_size`.
    pub fn from_hex(hash_size: u32, hex: &str) -> VisregResult<Self> {
        check_hash_size(hash_size)?;
        let expected = byte_len(hash_size);
        if hex.len() != expected * 2 || !hex.is_ascii() {
            return Err(VisregError::invalid_argument(format!(
                "expected {} hex digits for a {hash_size}x{hash_size} hash",
                expected * 2
            )));
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| VisregError::invalid_argument(format!("invalid hash hex: {e}")))?;
        let hash = ImageHash::from_bytes(&bytes)
            .map_err(|e| VisregError::invalid_argument(format!("invalid hash bytes: {e:?}")))?;
        Ok(Self { hash_size, hash })
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Serialized form of [`PerceptualHash`]
#[derive(Serialize, Deserialize)]
struct HexHash {
    hash_size: u32,
    hex: String,
}

impl From<PerceptualHash> for HexHash {
    fn from(hash: PerceptualHash) -> Self {
        Self {
            hash_size: hash.hash_size,
            hex: hash.to_hex(),
        }
    }
}

impl TryFrom<HexHash> for PerceptualHash {
    type Error = VisregError;

    fn try_from(raw: HexHash) -> Result<Self, Self::Error> {
        Self::from_hex(raw.hash_size, &raw.hex)
    }
}

/// Computes [`PerceptualHash`]es of a fixed size
pub struct PerceptualHasher {
    hash_size: u32,
    hasher: Hasher,
}

impl fmt::Debug for PerceptualHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerceptualHasher")
            .field("hash_size", &self.hash_size)
            .finish_non_exhaustive()
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::build(DEFAULT_HASH_SIZE)
    }
}

impl PerceptualHasher {
    /// Create a hasher producing `hash_size x hash_size` bit hashes.
    ///
    /// # Errors
    ///
    /// Returns [`VisregError::InvalidArgument`] unless
    /// `1 <= hash_size <= MAX_HASH_SIZE`.
    pub fn new(hash_size: u32) -> VisregResult<Self> {
        check_hash_size(hash_size)?;
        Ok(Self::build(hash_size))
    }

    fn build(hash_size: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_size(hash_size, hash_size)
            .resize_filter(FilterType::Triangle)
            .preproc_dct()
            .hash_alg(HashAlg::Median)
            .to_hasher();
        Self { hash_size, hasher }
    }

    /// Side length of the hashes this hasher produces
    #[must_use]
    pub const fn hash_size(&self) -> u32 {
        self.hash_size
    }

    /// Hash an image. Deterministic for a given image and size.
    ///
    /// # Errors
    ///
    /// Returns [`VisregError::InvalidArgument`] for a zero-sized image.
    pub fn compute(&self, image: &RgbaImage) -> VisregResult<PerceptualHash> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VisregError::invalid_argument("cannot hash an empty image"));
        }
        Ok(PerceptualHash {
            hash_size: self.hash_size,
            hash: self.hasher.hash_image(image),
        })
    }
}

/// Hash an image with the given grid size.
pub fn compute_hash(image: &RgbaImage, hash_size: u32) -> VisregResult<PerceptualHash> {
    PerceptualHasher::new(hash_size)?.compute(image)
}

/// Count of differing bits between two hashes.
pub fn hamming_distance(a: &PerceptualHash, b: &PerceptualHash) -> VisregResult<u32> {
    a.hamming_distance(b)
}

fn check_hash_size(hash_size: u32) -> VisregResult<()> {
    if hash_size == 0 || hash_size > MAX_HASH_SIZE {
        return Err(VisregError::invalid_argument(format!(
            "hash size {hash_size} outside [1, {MAX_HASH_SIZE}]"
        )));
    }
    Ok(())
}

const fn byte_len(hash_size: u32) -> usize {
    ((hash_size * hash_size) as usize).div_ceil(8)
}
