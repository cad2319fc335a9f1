//! Leaf-level name matching.

use regex::Regex;
use std::fmt;

use crate::error::FilterError;

/// A compiled name pattern with whole-string semantics.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern. The name must match the entire pattern, not a substring.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        // Validate on its own first so a pattern like `a)|(b` cannot escape the anchors.
        Regex::new(source)?;
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Ordered include and exclude patterns for one kind of name.
///
/// An empty filter includes everything. An exclude match always wins over an include.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternFilter {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl PatternFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from pattern strings, failing on the first invalid one.
    pub fn from_patterns<I, E>(includes: I, excludes: E) -> Result<Self, FilterError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut filter = Self::new();
        for source in includes {
            let source = source.as_ref();
            let pattern = Pattern::new(source)
                .map_err(|e| FilterError::invalid_pattern(source, "include patterns", &e))?;
            filter.include(pattern);
        }
        for source in excludes {
            let source = source.as_ref();
            let pattern = Pattern::new(source)
                .map_err(|e| FilterError::invalid_pattern(source, "exclude patterns", &e))?;
            filter.exclude(pattern);
        }
        Ok(filter)
    }

    /// Add an include pattern; repeated patterns are kept once.
    pub fn include(&mut self, pattern: Pattern) {
        if !self.includes.contains(&pattern) {
            self.includes.push(pattern);
        }
    }

    /// Add an exclude pattern; repeated patterns are kept once.
    pub fn exclude(&mut self, pattern: Pattern) {
        if !self.excludes.contains(&pattern) {
            self.excludes.push(pattern);
        }
    }

    /// Union with another filter, keeping this filter's patterns first.
    pub fn merge(&mut self, other: &PatternFilter) {
        for pattern in &other.includes {
            self.include(pattern.clone());
        }
        for pattern in &other.excludes {
            self.exclude(pattern.clone());
        }
    }

    pub fn includes(&self) -> &[Pattern] {
        &self.includes
    }

    pub fn excludes(&self) -> &[Pattern] {
        &self.excludes
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    pub fn is_included(&self, name: &str) -> bool {
        let included =
            self.includes.is_empty() || self.includes.iter().any(|p| p.matches(name));
        included && !self.excludes.iter().any(|p| p.matches(name))
    }
}
