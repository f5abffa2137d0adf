//! Bucket name validation.

use crate::error::{CoreError, CoreResult};
use std::borrow::Borrow;
use std::fmt;

/// A validated bucket name.
///
/// Every bucket-name input, from a request body or a path, goes through
/// [`BucketName::parse`]: surrounding whitespace is trimmed and the result
/// must be non-empty. The trimmed form is the bucket's identity, so
/// `" fruit "` and `"fruit"` name the same bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketName(String);

impl BucketName {
    /// Validates and normalizes a bucket name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBucketName`] if the name is blank.
    ///
    /// # Example
    ///
    /// ```
    /// use bucketdb_core::BucketName;
    ///
    /// assert_eq!(BucketName::parse("  fruit\t").unwrap().as_str(), "fruit");
    /// assert!(BucketName::parse("   ").is_err());
    /// ```
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidBucketName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the UTF-8 bytes of the name.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Consumes the name, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BucketName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for BucketName {
    type Error = CoreError;

    fn try_from(raw: &str) -> CoreResult<Self> {
        Self::parse(raw)
    }
}
