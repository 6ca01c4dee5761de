use serde::{Deserialize, Serialize};

use univia_types::models::Category;

/// Destination folder per submission category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMap {
    pub certificate: String,
    pub eca: String,
    pub leave: String,
}

impl FolderMap {
    pub fn folder_for(&self, category: Category) -> &str {
        match category {
            Category::Certificate => &self.certificate,
            Category::Eca => &self.eca,
            Category::Leave => &self.leave,
        }
    }
}

impl Default for FolderMap {
    /// The Drive folders the documents have always been filed under.
    fn default() -> Self {
        Self {
            certificate: "1mF3Fs8wm3K_GCwNgdAKbyuZVGP4bWtsZ".into(),
            eca: "1zBESOEYxnwCBOrjd6V35r4cc60qedbZS".into(),
            leave: "1fNpf2OZfPDghVX42XlD0iUdDVfphSNYL".into(),
        }
    }
}
