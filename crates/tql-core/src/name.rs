//! Qualified names (`System.ToList`, `Genealogy.People`).

use std::fmt;
use std::str::FromStr;

/// A dot-separated qualified name.
///
/// Symbols, module members, type names and host argument keys all use this
/// representation. Comparison is component-wise and case-sensitive.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    /// A single-component name.
    pub fn simple(component: impl Into<String>) -> Self {
        Self {
            components: vec![component.into()],
        }
    }

    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a dotted string. Empty segments are dropped.
    pub fn parse(text: &str) -> Self {
        Self::from_components(text.split('.').filter(|s| !s.is_empty()))
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_qualified(&self) -> bool {
        self.components.len() > 1
    }

    /// The final component, or `""` for the empty name.
    pub fn last(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or("")
    }

    /// `self` with one more component appended.
    pub fn child(&self, component: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        components.push(component.into());
        Self { components }
    }

    /// `self` followed by every component of `suffix`.
    pub fn join(&self, suffix: &Name) -> Self {
        let mut components = self.components.clone();
        components.extend(suffix.components.iter().cloned());
        Self { components }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(component)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl FromStr for Name {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let name = Name::parse("System.Math.Abs");
        assert_eq!(name.components().len(), 3);
        assert_eq!(name.to_string(), "System.Math.Abs");
        assert_eq!(name.last(), "Abs");
        assert!(name.is_qualified());
    }

    #[test]
    fn child_and_join() {
        let prefix = Name::simple("Sys");
        assert_eq!(prefix.child("ToList"), Name::parse("Sys.ToList"));
        assert_eq!(
            prefix.join(&Name::parse("Color.Red")),
            Name::parse("Sys.Color.Red")
        );
    }

    #[test]
    fn empty_segments_dropped() {
        assert_eq!(Name::parse("a..b"), Name::parse("a.b"));
        assert!(Name::parse("").is_empty());
        assert_eq!(Name::parse("").last(), "");
    }
}
