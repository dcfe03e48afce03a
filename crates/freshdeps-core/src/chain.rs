use std::fmt;
use std::sync::Arc;

/// Path of package names from a root dependency down to the package that
/// declared the current edge. Each recursion branch gets its own extended
/// copy through [`AncestorChain::child`]; a chain is never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AncestorChain {
    names: Arc<[String]>,
}

impl Default for AncestorChain {
    fn default() -> Self {
        Self {
            names: Vec::new().into(),
        }
    }
}

impl AncestorChain {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut names = Vec::with_capacity(self.names.len() + 1);
        names.extend(self.names.iter().cloned());
        names.push(name.to_string());
        Self {
            names: names.into(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing == name)
    }

    /// Direct parent of the edge, `None` for root dependencies.
    pub fn nearest(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    /// Root dependency the edge was reached through.
    pub fn origin(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl<S: Into<String>> FromIterator<S> for AncestorChain {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let names: Vec<String> = iter.into_iter().map(Into::into).collect();
        Self {
            names: names.into(),
        }
    }
}

impl fmt::Display for AncestorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names.join(" -> "))
    }
}
