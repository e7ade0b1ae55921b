//! Cache key construction
//!
//! Listing keys follow a dash-joined convention: a family name followed by
//! the parameters that distinguish one variant from another (filters, locale,
//! page size, offset). Because variants share the family as a leading
//! substring, `TtlCache::invalidate(family)` clears all of them at once.

use std::fmt::Display;

/// Builder for dash-joined cache keys.
///
/// # Examples
///
/// ```
/// use tracknotes_cache::CacheKey;
///
/// let key = CacheKey::new("threads")
///    .part("general")
///    .part("es")
///    .part(20)
///    .part(0)
///    .build();
///
/// assert_eq!(key, "threads-general-es-20-0");
/// ```
#[derive(Debug, Clone)]
pub struct CacheKey {
   key: String,
}

impl CacheKey {
   /// Start a key with its family name: the prefix later passed to
   /// `invalidate` when a write makes the family stale.
   pub fn new(family: impl Into<String>) -> Self {
      Self { key: family.into() }
   }

   /// Append one distinguishing parameter.
   pub fn part(mut self, part: impl Display) -> Self {
      self.key.push('-');
      self.key.push_str(&part.to_string());
      self
   }

   /// Finish the key.
   pub fn build(self) -> String {
      self.key
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_family_alone_is_a_valid_key() {
      assert_eq!(CacheKey::new("stats").build(), "stats");
   }

   #[test]
   fn test_parts_join_with_dashes() {
      let key = CacheKey::new("threads")
         .part("general")
         .part("es")
         .part(20)
         .part(0)
         .build();

      assert_eq!(key, "threads-general-es-20-0");
   }

   #[test]
   fn test_key_starts_with_its_family() {
      let key = CacheKey::new("reviews").part("recent").part(10).build();
      assert!(key.starts_with("reviews"));
   }
}
