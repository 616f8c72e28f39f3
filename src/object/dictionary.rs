//! PDF Dictionary object.

use super::{Object, PdfName};
use indexmap::IndexMap;

/// A PDF dictionary object.
///
/// Dictionaries are written as `<< /Key1 value1 /Key2 value2 >>`. Keys are
/// names, compared by byte value; each key appears at most once. The map
/// preserves insertion order for reproducible output, although the format
/// itself attaches no meaning to key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfDictionary {
    entries: IndexMap<PdfName, Object>,
}

impl PdfDictionary {
    /// Creates a new empty dictionary.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Creates a dictionary with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Sets a key-value pair, replacing any previous value for the key.
    pub fn set(&mut self, key: impl Into<PdfName>, value: impl Into<Object>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Inserts a key-value pair only if the key is not already present.
    ///
    /// The parser uses this so that a duplicate key in malformed input keeps
    /// the first occurrence.
    pub fn set_if_absent(&mut self, key: impl Into<PdfName>, value: impl Into<Object>) {
        self.entries.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Gets a value by key.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Object> {
        self.entries.get(key.as_ref())
    }

    /// Checks if the dictionary contains a key.
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.entries.contains_key(key.as_ref())
    }

    /// Removes a key and returns its value, preserving the order of the rest.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<Object> {
        self.entries.shift_remove(key.as_ref())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the key-value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&PdfName, &Object)> {
        self.entries.iter()
    }

    /// Convenience accessor: value as i64, following no references.
    pub fn get_integer(&self, key: impl AsRef<[u8]>) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    /// Convenience accessor: value as a name.
    pub fn get_name(&self, key: impl AsRef<[u8]>) -> Option<&PdfName> {
        match self.get(key) {
            Some(Object::Name(n)) => Some(n),
            _ => None,
        }
    }

    /// Serializes the dictionary to PDF syntax.
    pub fn to_pdf_string(&self) -> String {
        let mut result = String::from("<<");
        for (key, value) in &self.entries {
            result.push(' ');
            result.push_str(&key.to_pdf_string());
            result.push(' ');
            result.push_str(&value.to_pdf_string());
        }
        result.push_str(" >>");
        result
    }
}

/// Builder for creating PDF dictionaries fluently.
#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    dict: PdfDictionary,
}

impl DictionaryBuilder {
    /// Creates a new dictionary builder.
    pub fn new() -> Self {
        Self {
            dict: PdfDictionary::new(),
        }
    }

    /// Sets a key-value pair.
    pub fn set(mut self, key: impl Into<PdfName>, value: impl Into<Object>) -> Self {
        self.dict.set(key, value);
        self
    }

    /// Sets the /Type key.
    pub fn type_name(self, name: impl Into<PdfName>) -> Self {
        self.set("Type", Object::Name(name.into()))
    }

    /// Builds the dictionary.
    pub fn build(self) -> PdfDictionary {
        self.dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dictionary() {
        assert_eq!(PdfDictionary::new().to_pdf_string(), "<< >>");
    }

    #[test]
    fn test_dictionary_with_entries() {
        let mut dict = PdfDictionary::new();
        dict.set("Type", Object::Name("Page".into()));
        dict.set("Count", Object::Integer(1));
        assert_eq!(dict.to_pdf_string(), "<< /Type /Page /Count 1 >>");
    }

    #[test]
    fn test_set_if_absent_keeps_first() {
        let mut dict = PdfDictionary::new();
        dict.set_if_absent("Key", Object::Integer(1));
        dict.set_if_absent("Key", Object::Integer(2));
        assert_eq!(dict.get("Key"), Some(&Object::Integer(1)));
    }

    #[test]
    fn test_byte_slice_lookup() {
        let mut dict = PdfDictionary::new();
        dict.set("Root", Object::Integer(3));
        assert!(dict.get(b"Root".as_slice()).is_some());
        assert!(dict.get("Missing").is_none());
    }

    #[test]
    fn test_dictionary_preserves_order() {
        let mut dict = PdfDictionary::new();
        dict.set("A", Object::Integer(1));
        dict.set("B", Object::Integer(2));
        dict.set("C", Object::Integer(3));
        let keys: Vec<_> = dict.iter().map(|(k, _)| k.as_str().unwrap()).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_dictionary_builder() {
        let dict = DictionaryBuilder::new()
            .type_name("Catalog")
            .set("Version", Object::Name("1.7".into()))
            .build();
        assert!(dict.to_pdf_string().contains("/Type /Catalog"));
    }
}
