//! FileSize Type-Safe Wrapper
//!
//! Byte sizes for artifacts and size ceilings, with MB conversions and
//! zero-safe ratios.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FileSize Newtype
// ============================================================================

/// File size in bytes.
///
/// # Examples
/// ```
/// use shared_utils::types::file_size::FileSize;
///
/// let ceiling = FileSize::from_mb(10);
/// let produced = FileSize::from_mb(25);
/// assert_eq!(produced.ratio_to(ceiling), Some(2.5));
/// assert_eq!(ceiling.display(), "10.00 MB");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSize(u64);

impl FileSize {
    pub const ZERO: FileSize = FileSize(0);

    pub const KB: u64 = 1024;
    pub const MB: u64 = 1024 * 1024;
    pub const GB: u64 = 1024 * 1024 * 1024;

    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn from_kb(kb: u64) -> Self {
        Self(kb * Self::KB)
    }

    #[inline]
    pub const fn from_mb(mb: u64) -> Self {
        Self(mb * Self::MB)
    }

    /// Fractional megabytes, as typed on the command line (`-o 2.5`).
    ///
    /// Negative and NaN inputs give `ZERO`.
    pub fn from_mb_f64(mb: f64) -> Self {
        if mb.is_nan() || mb <= 0.0 {
            return Self::ZERO;
        }
        Self((mb * Self::MB as f64).round() as u64)
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    pub fn as_mb(&self) -> f64 {
        self.0 as f64 / Self::MB as f64
    }

    #[inline]
    pub fn saturating_sub(&self, other: FileSize) -> FileSize {
        FileSize(self.0.saturating_sub(other.0))
    }

    /// `self / other`, or `None` when `other` is zero.
    pub fn ratio_to(&self, other: FileSize) -> Option<f64> {
        if other.0 == 0 {
            None
        } else {
            Some(self.0 as f64 / other.0 as f64)
        }
    }

    /// Percentage by which `self` is smaller than `original`.
    ///
    /// Positive means reduction, negative means growth.
    pub fn reduction_percent(&self, original: FileSize) -> Option<f64> {
        self.ratio_to(original).map(|r| (1.0 - r) * 100.0)
    }

    pub fn display(&self) -> String {
        if self.0 >= Self::GB {
            format!("{:.2} GB", self.0 as f64 / Self::GB as f64)
        } else if self.0 >= Self::MB {
            format!("{:.2} MB", self.0 as f64 / Self::MB as f64)
        } else if self.0 >= Self::KB {
            format!("{:.2} KB", self.0 as f64 / Self::KB as f64)
        } else {
            format!("{} B", self.0)
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSize({} = {})", self.0, self.display())
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl Default for FileSize {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u64> for FileSize {
    fn from(bytes: u64) -> Self {
        Self::new(bytes)
    }
}

impl From<FileSize> for u64 {
    fn from(size: FileSize) -> Self {
        size.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size_creation() {
        assert_eq!(FileSize::new(1024).bytes(), 1024);
        assert_eq!(FileSize::from_kb(1).bytes(), 1024);
        assert_eq!(FileSize::from_mb(1).bytes(), 1024 * 1024);
    }

    #[test]
    fn test_from_mb_f64() {
        assert_eq!(FileSize::from_mb_f64(1.0), FileSize::from_mb(1));
        assert_eq!(FileSize::from_mb_f64(0.5).bytes(), 512 * 1024);
        assert_eq!(FileSize::from_mb_f64(-3.0), FileSize::ZERO);
        assert_eq!(FileSize::from_mb_f64(f64::NAN), FileSize::ZERO);
    }

    #[test]
    fn test_ratio_to() {
        let produced = FileSize::from_mb(13);
        let ceiling = FileSize::from_mb(10);
        let ratio = produced.ratio_to(ceiling).unwrap();
        assert!((ratio - 1.3).abs() < 1e-9);

        assert_eq!(produced.ratio_to(FileSize::ZERO), None);
    }

    #[test]
    fn test_reduction_percent() {
        let output = FileSize::new(250);
        let input = FileSize::new(1000);
        assert_eq!(output.reduction_percent(input), Some(75.0));

        let grown = FileSize::new(1500);
        assert_eq!(grown.reduction_percent(input), Some(-50.0));
        assert_eq!(output.reduction_percent(FileSize::ZERO), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FileSize::new(500).display(), "500 B");
        assert_eq!(FileSize::new(1024).display(), "1.00 KB");
        assert_eq!(FileSize::new(1024 * 1024).display(), "1.00 MB");
        assert_eq!(FileSize::new(1024 * 1024 * 1024).display(), "1.00 GB");
    }

    #[test]
    fn test_as_mb() {
        assert_eq!(FileSize::from_mb(25).as_mb(), 25.0);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&FileSize::new(4096)).unwrap();
        assert_eq!(json, "4096");
        let back: FileSize = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bytes(), 4096);
    }
}
