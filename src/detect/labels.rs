//! Class-name taxonomy.
//!
//! One class name per line; the line index is the class id. Class id 0 is
//! the follow target ("person" in the COCO taxonomy).

use std::path::Path;

/// Label shown for class ids outside the taxonomy.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    /// Load labels from disk.
    ///
    /// A missing or unreadable file yields an empty map; every class then
    /// renders as `Unknown`.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let labels = Self::parse(&raw);
                log::info!("loaded {} class labels from {}", labels.len(), path.display());
                labels
            }
            Err(e) => {
                log::warn!(
                    "label file {} unavailable ({}); labels will render as {}",
                    path.display(),
                    e,
                    UNKNOWN_LABEL
                );
                Self::default()
            }
        }
    }

    /// Parse newline-separated labels. Interior blank lines keep their index.
    pub fn parse(raw: &str) -> Self {
        let mut names: Vec<String> = raw
            .split('\n')
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();
        if names.last().is_some_and(|last| last.is_empty()) {
            names.pop();
        }
        Self { names }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self, class_id: u32) -> &str {
        self.names
            .get(class_id as usize)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_indices_and_drops_trailing_newline() {
        let labels = LabelMap::parse("person\r\nbicycle\n\ncar\n");
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.name(0), "person");
        assert_eq!(labels.name(1), "bicycle");
        assert_eq!(labels.name(2), "");
        assert_eq!(labels.name(3), "car");
        assert_eq!(labels.name(4), UNKNOWN_LABEL);
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let labels = LabelMap::load("/nonexistent/follow-pilot/coco.txt");
        assert!(labels.is_empty());
        assert_eq!(labels.name(0), UNKNOWN_LABEL);
    }
}
