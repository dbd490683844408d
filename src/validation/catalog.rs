//! Item catalog offered by the entry form

/// Items stocked by the warehouse
pub const STANDARD_ITEMS: &[&str] = &["iPhone 15", "Samsung S24", "MacBook Air", "Dell XPS"];

/// Configurable list of items accepted by the entry form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCatalog {
    items: Vec<String>,
}

impl ItemCatalog {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog: Vec<String> = Vec::new();
        for item in items {
            let item = item.into().trim().to_string();
            if !item.is_empty() && !catalog.iter().any(|c| c.eq_ignore_ascii_case(&item)) {
                catalog.push(item);
            }
        }
        Self { items: catalog }
    }

    /// Parse a comma-separated list ("iPhone 15, Dell XPS")
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Canonical spelling of `item` if it is in the catalog (case-insensitive)
    pub fn canonical(&self, item: &str) -> Option<&str> {
        let item = item.trim();
        self.items
            .iter()
            .find(|c| c.eq_ignore_ascii_case(item))
            .map(String::as_str)
    }
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::new(STANDARD_ITEMS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = ItemCatalog::default();
        assert_eq!(catalog.items().len(), 4);
        assert_eq!(catalog.canonical("iphone 15"), Some("iPhone 15"));
        assert_eq!(catalog.canonical("  DELL XPS "), Some("Dell XPS"));
        assert_eq!(catalog.canonical("Pixel 8"), None);
    }

    #[test]
    fn test_parse_skips_blanks_and_duplicates() {
        let catalog = ItemCatalog::parse("Widget, , gadget,WIDGET");
        assert_eq!(catalog.items(), &["Widget".to_string(), "gadget".to_string()]);
    }
}
