//! Policy document model and XML parsing.
//!
//! ## Format
//!
//! ```xml
//! <AccessControl>
//!   <Level id="1">
//!     <Page>/dashboard</Page>
//!     <Page>/insert_rock</Page>
//!   </Level>
//!   <Level id="2">
//!     <Page>/dashboard</Page>
//!   </Level>
//! </AccessControl>
//! ```
//!
//! Element and attribute names are matched case-insensitively, so documents
//! written as `<level id="1"><page>..</page></level>` load the same way. The
//! root element name is not checked.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::types::{LevelId, PathPrefix};
use super::PolicyError;

/// Allowed paths for a single level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelPolicy {
    /// The level this entry applies to.
    pub level: LevelId,
    /// Allowed path prefixes, in document order.
    pub pages: Vec<PathPrefix>,
}

impl LevelPolicy {
    /// Create a level entry.
    pub fn new(level: LevelId, pages: Vec<PathPrefix>) -> Self {
        Self { level, pages }
    }

    /// Whether any page of this level covers `base_path`.
    pub fn allows(&self, base_path: &PathPrefix) -> bool {
        self.pages.iter().any(|page| page.covers(base_path))
    }
}

/// Ordered mapping from level to allowed path prefixes.
///
/// Level ids are unique within a document; pages may repeat across levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDocument {
    levels: Vec<LevelPolicy>,
}

impl PolicyDocument {
    /// Build a document, rejecting duplicate level ids.
    pub fn new(levels: Vec<LevelPolicy>) -> Result<Self, PolicyError> {
        let mut seen = BTreeSet::new();
        for entry in &levels {
            if !seen.insert(entry.level) {
                return Err(PolicyError::Malformed(format!(
                    "duplicate level id {}",
                    entry.level
                )));
            }
        }
        Ok(Self { levels })
    }

    /// Parse a document from its XML representation.
    pub fn parse(xml: &str) -> Result<Self, PolicyError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut levels = Vec::new();
        let mut current: Option<LevelPolicy> = None;
        let mut page_text: Option<String> = None;

        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Start(e) => match Element::of(e.local_name().as_ref()) {
                    Element::Level => {
                        if current.is_some() {
                            return Err(PolicyError::Malformed("nested Level element".into()));
                        }
                        current = Some(LevelPolicy::new(level_id(&e)?, Vec::new()));
                    }
                    Element::Page => {
                        if current.is_none() {
                            return Err(PolicyError::Malformed("Page outside of a Level".into()));
                        }
                        page_text = Some(String::new());
                    }
                    Element::Other => {}
                },
                Event::Empty(e) => match Element::of(e.local_name().as_ref()) {
                    Element::Level => {
                        if current.is_some() {
                            return Err(PolicyError::Malformed("nested Level element".into()));
                        }
                        levels.push(LevelPolicy::new(level_id(&e)?, Vec::new()));
                    }
                    Element::Page => {
                        return Err(PolicyError::Malformed("empty Page element".into()));
                    }
                    Element::Other => {}
                },
                Event::Text(t) => {
                    if let Some(buf) = page_text.as_mut() {
                        buf.push_str(&t.unescape().map_err(malformed)?);
                    }
                }
                Event::CData(c) => {
                    if let Some(buf) = page_text.as_mut() {
                        let bytes = c.into_inner();
                        let text = std::str::from_utf8(&bytes).map_err(malformed)?;
                        buf.push_str(text);
                    }
                }
                Event::End(e) => match Element::of(e.local_name().as_ref()) {
                    Element::Page => {
                        let text = page_text.take().unwrap_or_default();
                        let page = PathPrefix::parse(&text).ok_or_else(|| {
                            PolicyError::Malformed(format!("page {:?} is not an absolute path", text))
                        })?;
                        if let Some(level) = current.as_mut() {
                            level.pages.push(page);
                        }
                    }
                    Element::Level => {
                        if let Some(level) = current.take() {
                            levels.push(level);
                        }
                    }
                    Element::Other => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if current.is_some() {
            return Err(PolicyError::Malformed("unterminated Level element".into()));
        }

        Self::new(levels)
    }

    /// All level entries in document order.
    pub fn levels(&self) -> &[LevelPolicy] {
        &self.levels
    }

    /// Allowed pages for a level, if the document mentions it.
    pub fn pages_for(&self, level: LevelId) -> Option<&[PathPrefix]> {
        self.levels
            .iter()
            .find(|entry| entry.level == level)
            .map(|entry| entry.pages.as_slice())
    }

    /// Whether `base_path` is allowed for `level`.
    ///
    /// Levels absent from the document are allowed nothing.
    pub fn is_allowed(&self, level: LevelId, base_path: &PathPrefix) -> bool {
        self.levels
            .iter()
            .find(|entry| entry.level == level)
            .is_some_and(|entry| entry.allows(base_path))
    }
}

enum Element {
    Level,
    Page,
    Other,
}

impl Element {
    fn of(local_name: &[u8]) -> Self {
        if local_name.eq_ignore_ascii_case(b"level") {
            Self::Level
        } else if local_name.eq_ignore_ascii_case(b"page") {
            Self::Page
        } else {
            Self::Other
        }
    }
}

fn level_id(element: &BytesStart<'_>) -> Result<LevelId, PolicyError> {
    for attr in element.attributes() {
        let attr = attr.map_err(malformed)?;
        if attr.key.local_name().as_ref().eq_ignore_ascii_case(b"id") {
            let value = attr.unescape_value().map_err(malformed)?;
            return LevelId::parse(&value).ok_or_else(|| {
                PolicyError::Malformed(format!("level id {:?} is not a positive integer", value))
            });
        }
    }
    Err(PolicyError::Malformed("Level element without an id attribute".into()))
}

fn malformed(e: impl std::fmt::Display) -> PolicyError {
    PolicyError::Malformed(e.to_string())
}
