//! Parameters captured from a matched path.

/// Name/value pairs captured by a route match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    items: Vec<(String, String)>,
}

impl PathParams {
    pub(crate) fn new(items: Vec<(String, String)>) -> Self {
        Self { items }
    }

    /// Value of the first parameter with this name, if captured.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
