//! Page-tree traversal.
//!
//! Pages hang off /Root → /Pages → /Kids, where intermediate nodes may nest
//! arbitrarily and a /Kids value may itself be indirect. Leaf dictionaries
//! are returned as stored; the inheritable attributes (/Resources,
//! /MediaBox, /CropBox, /Rotate) cascade from ancestors only when asked for.

use super::PdfReader;
use crate::error::{ParseError, PdfResult};
use crate::io::{read_to_end, ConcatReader, MemoryReader};
use crate::object::{Object, PdfDictionary};
use crate::types::ObjectId;
use std::collections::HashSet;

/// Attributes a page inherits from its ancestors.
pub const INHERITABLE_PAGE_KEYS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

impl PdfReader {
    /// The catalog (root) dictionary.
    pub fn catalog(&self) -> PdfResult<PdfDictionary> {
        let obj = self.resolve(self.trailer().root)?;
        match obj {
            Object::Dictionary(d) => Ok(d),
            _ => Err(ParseError::TypeMismatch {
                expected: "dictionary",
                context: "/Root",
            }
            .into()),
        }
    }

    /// The document info dictionary, when present.
    pub fn info(&self) -> PdfResult<Option<PdfDictionary>> {
        let Some(info_ref) = self.trailer().info else {
            return Ok(None);
        };
        match self.resolve(info_ref)? {
            Object::Dictionary(d) => Ok(Some(d)),
            _ => Ok(None),
        }
    }

    /// The ids of all page leaves, in document order.
    pub fn page_ids(&self) -> PdfResult<Vec<ObjectId>> {
        let catalog = self.catalog()?;
        let pages_ref = match catalog.get("Pages") {
            Some(Object::Reference(id)) => *id,
            _ => {
                return Err(ParseError::TypeMismatch {
                    expected: "reference",
                    context: "/Pages",
                }
                .into())
            }
        };

        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_page_ids(pages_ref, &mut out, &mut visited)?;
        Ok(out)
    }

    fn collect_page_ids(
        &self,
        node_ref: ObjectId,
        out: &mut Vec<ObjectId>,
        visited: &mut HashSet<u32>,
    ) -> PdfResult<()> {
        if !visited.insert(node_ref.number) {
            return Err(ParseError::LimitExceeded(format!(
                "page tree revisits object {}",
                node_ref.number
            ))
            .into());
        }

        let node = match self.resolve(node_ref)? {
            Object::Dictionary(d) => d,
            _ => {
                return Err(ParseError::TypeMismatch {
                    expected: "dictionary",
                    context: "page tree node",
                }
                .into())
            }
        };

        match node.get_name("Type").map(|n| n.as_bytes()) {
            Some(b"Page") => {
                out.push(node_ref);
                Ok(())
            }
            Some(b"Pages") => {
                // /Kids may itself be indirect
                let kids = self.resolve_object(node.get("Kids").unwrap_or(&Object::Null))?;
                let kids = match kids {
                    Object::Array(a) => a,
                    _ => {
                        return Err(ParseError::TypeMismatch {
                            expected: "array",
                            context: "/Kids",
                        }
                        .into())
                    }
                };
                for kid in kids.iter() {
                    match kid {
                        Object::Reference(id) => {
                            self.collect_page_ids(*id, out, visited)?;
                        }
                        _ => {
                            return Err(ParseError::TypeMismatch {
                                expected: "reference",
                                context: "/Kids entry",
                            }
                            .into())
                        }
                    }
                }
                Ok(())
            }
            _ => Err(ParseError::TypeMismatch {
                expected: "/Page or /Pages",
                context: "page tree node",
            }
            .into()),
        }
    }

    /// Number of pages, counted by walking the tree.
    pub fn page_count(&self) -> PdfResult<usize> {
        Ok(self.page_ids()?.len())
    }

    /// The i-th page dictionary (0-based), inheritance not applied.
    pub fn page(&self, index: usize) -> PdfResult<PdfDictionary> {
        let ids = self.page_ids()?;
        let id = ids.get(index).copied().ok_or_else(|| {
            ParseError::LimitExceeded(format!("page {} of {}", index, ids.len()))
        })?;
        match self.resolve(id)? {
            Object::Dictionary(d) => Ok(d),
            _ => Err(ParseError::TypeMismatch {
                expected: "dictionary",
                context: "page",
            }
            .into()),
        }
    }

    /// Looks an attribute up on a page, walking /Parent chains for the
    /// inheritable ones when the page itself lacks it.
    pub fn page_attribute(
        &self,
        page: &PdfDictionary,
        key: &str,
    ) -> PdfResult<Option<Object>> {
        if let Some(value) = page.get(key) {
            return Ok(Some(self.resolve_object(value)?));
        }
        if !INHERITABLE_PAGE_KEYS.contains(&key) {
            return Ok(None);
        }

        let mut visited = HashSet::new();
        let mut parent = page.get("Parent").and_then(Object::as_reference);
        while let Some(parent_ref) = parent {
            if !visited.insert(parent_ref.number) {
                return Err(ParseError::LimitExceeded(
                    "cycle in /Parent chain".to_string(),
                )
                .into());
            }
            let node = match self.resolve(parent_ref)? {
                Object::Dictionary(d) => d,
                _ => return Ok(None),
            };
            if let Some(value) = node.get(key) {
                return Ok(Some(self.resolve_object(value)?));
            }
            parent = node.get("Parent").and_then(Object::as_reference);
        }
        Ok(None)
    }

    /// Concatenated, decoded content of a page. /Contents may be a single
    /// stream or an array of streams; either way the result reads as one.
    pub fn page_content(&self, page: &PdfDictionary) -> PdfResult<Vec<u8>> {
        let contents = match page.get("Contents") {
            Some(c) => c.clone(),
            None => return Ok(Vec::new()),
        };

        let mut parts = Vec::new();
        match &contents {
            Object::Reference(id) => self.push_content_part(*id, &mut parts)?,
            Object::Array(arr) => {
                for element in arr.iter() {
                    match element {
                        Object::Reference(id) => self.push_content_part(*id, &mut parts)?,
                        _ => {
                            return Err(ParseError::TypeMismatch {
                                expected: "reference",
                                context: "/Contents entry",
                            }
                            .into())
                        }
                    }
                }
            }
            _ => {
                return Err(ParseError::TypeMismatch {
                    expected: "reference or array",
                    context: "/Contents",
                }
                .into())
            }
        }

        let mut reader = ConcatReader::new(parts);
        Ok(read_to_end(&mut reader)?)
    }

    fn push_content_part(
        &self,
        id: ObjectId,
        parts: &mut Vec<MemoryReader>,
    ) -> PdfResult<()> {
        match self.resolve(id)? {
            Object::Stream(stream) => {
                let data = self.stream_data_with_owner(&stream, id)?;
                parts.push(MemoryReader::new(data));
                Ok(())
            }
            _ => Err(ParseError::TypeMismatch {
                expected: "stream",
                context: "/Contents",
            }
            .into()),
        }
    }
}
