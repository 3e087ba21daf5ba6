use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved plan key holding files bucketed by extension category.
pub const MISC_FOLDER: &str = "_misc";

/// Misc category for readable files that matched no other file.
pub const UNGROUPED_CATEGORY: &str = "ungrouped";

/// Misc category for files without an extension.
pub const NO_EXTENSION_CATEGORY: &str = "no_extension";

/// Category name → filenames, as stored under [`MISC_FOLDER`].
pub type MiscBuckets = BTreeMap<String, Vec<String>>;

/// Ordered mapping from category name to the extensions it covers.
///
/// Serialized as a JSON object whose values are whitespace-separated
/// extension lists (`{"images": "jpg png gif"}`). Key order is preserved and
/// the first category listing an extension wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionMap {
    categories: Vec<(String, Vec<String>)>,
}

impl ExtensionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a category. Extensions are lowercased and lose any leading dot.
    /// A blank category name is ignored, since it could never become a folder.
    pub fn insert(&mut self, category: impl Into<String>, extensions: &str) {
        let category = category.into();
        if category.trim().is_empty() {
            return;
        }
        let exts = extensions
            .split_whitespace()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self.categories.push((category, exts));
    }

    /// First category whose list contains `ext` (already lowercased, no dot).
    pub fn category_for(&self, ext: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|(_, exts)| exts.iter().any(|e| e == ext))
            .map(|(cat, _)| cat.as_str())
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for ExtensionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (category, extensions) in iter {
            map.insert(category, extensions.as_ref());
        }
        map
    }
}

impl Serialize for ExtensionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, exts) in &self.categories {
            map.serialize_entry(category, &exts.join(" "))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtensionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExtensionMapVisitor;

        impl<'de> Visitor<'de> for ExtensionMapVisitor {
            type Value = ExtensionMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category name to space-separated extensions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ExtensionMap, A::Error> {
                let mut map = ExtensionMap::new();
                while let Some((category, extensions)) = access.next_entry::<String, String>()? {
                    map.insert(category, &extensions);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(ExtensionMapVisitor)
    }
}

/// Lowercase extension of `filename` without the dot, or "" if it has none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Category a misc file belongs to: the first mapped category for its
/// extension, else the extension itself, else [`NO_EXTENSION_CATEGORY`].
pub fn category_for_file(filename: &str, ext_map: &ExtensionMap) -> String {
    let ext = extension_of(filename);
    match ext_map.category_for(&ext) {
        Some(category) => category.to_string(),
        None if ext.is_empty() => NO_EXTENSION_CATEGORY.to_string(),
        None => ext,
    }
}

/// Bucket unreadable files by extension category, preserving input order within a bucket.
pub fn classify_misc<S: AsRef<str>>(misc_files: &[S], ext_map: &ExtensionMap) -> MiscBuckets {
    let mut buckets = MiscBuckets::new();
    for file in misc_files {
        let file = file.as_ref();
        buckets
            .entry(category_for_file(file, ext_map))
            .or_default()
            .push(file.to_string());
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext_map() -> ExtensionMap {
        [
            ("images", "jpg jpeg png"),
            ("archives", "zip tar gz"),
            ("pictures", "png bmp"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn mapped_extension_uses_category() {
        let buckets = classify_misc(&["photo.jpg", "backup.zip"], &ext_map());
        assert_eq!(buckets["images"], vec!["photo.jpg"]);
        assert_eq!(buckets["archives"], vec!["backup.zip"]);
    }

    #[test]
    fn extension_is_case_insensitive() {
        let buckets = classify_misc(&["PHOTO.JPG"], &ext_map());
        assert_eq!(buckets["images"], vec!["PHOTO.JPG"]);
    }

    #[test]
    fn first_matching_category_wins() {
        let buckets = classify_misc(&["a.png"], &ext_map());
        assert!(buckets.contains_key("images"));
        assert!(!buckets.contains_key("pictures"));
    }

    #[test]
    fn unmapped_extension_becomes_category() {
        let buckets = classify_misc(&["model.STL"], &ext_map());
        assert_eq!(buckets["stl"], vec!["model.STL"]);
    }

    #[test]
    fn missing_extension_never_empty_key() {
        let buckets = classify_misc(&["Makefile", ".bashrc"], &ext_map());
        assert!(!buckets.contains_key(""));
        assert_eq!(buckets[NO_EXTENSION_CATEGORY], vec!["Makefile", ".bashrc"]);
    }

    #[test]
    fn order_preserved_within_bucket() {
        let buckets = classify_misc(&["b.jpg", "a.jpg", "c.png"], &ext_map());
        assert_eq!(buckets["images"], vec!["b.jpg", "a.jpg", "c.png"]);
    }

    #[test]
    fn empty_input() {
        assert!(classify_misc::<&str>(&[], &ext_map()).is_empty());
    }

    #[test]
    fn insert_normalizes_extensions() {
        let mut map = ExtensionMap::new();
        map.insert("docs", ".PDF  .Doc");
        assert_eq!(map.category_for("pdf"), Some("docs"));
        assert_eq!(map.category_for("doc"), Some("docs"));
    }

    #[test]
    fn serde_preserves_key_order() {
        let json = r#"{"zeta": "z", "alpha": "a b", "mid": "m"}"#;
        let map: ExtensionMap = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"zeta":"z","alpha":"a b","mid":"m"}"#);
    }

    #[test]
    fn blank_category_names_are_skipped() {
        let map: ExtensionMap = serde_json::from_str(r#"{"": "jpg", "  ": "png", "pics": "gif"}"#).unwrap();
        assert_eq!(map.category_for("jpg"), None);
        assert_eq!(map.category_for("png"), None);
        assert_eq!(map.category_for("gif"), Some("pics"));
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"pics":"gif"}"#);

        let buckets = classify_misc(&["a.jpg", "b.gif"], &map);
        assert_eq!(buckets["jpg"], vec!["a.jpg"]);
        assert_eq!(buckets["pics"], vec!["b.gif"]);
    }
}
