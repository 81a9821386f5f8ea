//! YouTube topic categories the daily sweep is spread across.

/// A YouTube video category (`videoCategoryId` plus its display name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
}

impl Category {
    pub const fn new(id: &'static str, name: &'static str) -> Self {
        Self { id, name }
    }
}

/// The default category sweep.
///
/// Ids are YouTube's own assignable category ids. Searching per category
/// (rather than one big search) keeps any single topic from dominating a
/// batch.
pub const DEFAULT_CATEGORIES: [Category; 12] = [
    Category::new("1", "Film & Animation"),
    Category::new("2", "Autos & Vehicles"),
    Category::new("10", "Music"),
    Category::new("17", "Sports"),
    Category::new("20", "Gaming"),
    Category::new("22", "People & Blogs"),
    Category::new("23", "Comedy"),
    Category::new("24", "Entertainment"),
    Category::new("25", "News & Politics"),
    Category::new("26", "Howto & Style"),
    Category::new("27", "Education"),
    Category::new("28", "Science & Technology"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ids_unique() {
        let mut ids: Vec<_> = DEFAULT_CATEGORIES.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DEFAULT_CATEGORIES.len());
    }
}
