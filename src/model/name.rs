//! Shared name type for configuration entities.

use std::sync::Arc;

/// Name of a mix port, device or route.
///
/// Names are copied into every [`RoutingDecision`](crate::RoutingDecision),
/// so they use `Arc<str>` internally and clone without allocating.
///
/// # Example
///
/// ```
/// use audio_policy_routing::Name;
///
/// let speaker = Name::new("Speaker");
/// assert_eq!(speaker, "Speaker");
/// assert_ne!(speaker, Name::new("Earpiece"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    /// Creates a name from a string.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty name left by an absent attribute.
    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_equality() {
        let a = Name::new("primary output");
        let b = Name::new("primary output");
        let c = Name::new("deep_buffer");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "primary output");
    }

    #[test]
    fn test_name_display() {
        let name = Name::new("Remote Submix Out");
        assert_eq!(format!("{name}"), "Remote Submix Out");
    }

    #[test]
    fn test_name_unset() {
        assert!(Name::from(String::new()).is_unset());
        assert!(!Name::from("Speaker").is_unset());
    }
}
