//! Flat browse tree over a loaded catalog.
//!
//! Engine implementations answer browse requests from this tree: the root
//! node ([`MEDIA_ROOT_ID`]) is a browsable container whose children are the
//! catalog items in descriptor order.

use crate::source::MusicSource;
use bridge_traits::{FolderType, MediaItem, MediaMetadata, MEDIA_ROOT_ID};
use std::collections::HashMap;
use std::sync::Arc;

pub const ROOT_TITLE: &str = "Library";

#[derive(Debug, Clone)]
pub struct BrowseTree {
    root: MediaItem,
    children: Arc<Vec<MediaItem>>,
    index: HashMap<String, usize>,
}

impl BrowseTree {
    pub fn new(items: Arc<Vec<MediaItem>>) -> Self {
        let root = MediaItem::builder(MEDIA_ROOT_ID)
            .metadata(MediaMetadata {
                title: Some(ROOT_TITLE.to_string()),
                display_title: Some(ROOT_TITLE.to_string()),
                folder_type: FolderType::Container,
                is_playable: false,
                ..Default::default()
            })
            .build();

        // First occurrence wins if the descriptor repeats an id.
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            index.entry(item.media_id.clone()).or_insert(position);
        }

        Self {
            root,
            children: items,
            index,
        }
    }

    /// Tree over the source's current catalog snapshot.
    pub fn from_source(source: &dyn MusicSource) -> Self {
        Self::new(source.items())
    }

    pub fn root(&self) -> &MediaItem {
        &self.root
    }

    /// Children of `parent_id`; empty for leaves and unknown ids.
    pub fn children(&self, parent_id: &str) -> Vec<MediaItem> {
        if parent_id == MEDIA_ROOT_ID {
            self.children.as_ref().clone()
        } else {
            Vec::new()
        }
    }

    /// One page of children, `page` counting from zero.
    pub fn children_page(&self, parent_id: &str, page: u32, page_size: u32) -> Vec<MediaItem> {
        if parent_id != MEDIA_ROOT_ID || page_size == 0 {
            return Vec::new();
        }

        let start = (page as usize).saturating_mul(page_size as usize);
        self.children
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect()
    }

    pub fn item(&self, media_id: &str) -> Option<MediaItem> {
        if media_id == MEDIA_ROOT_ID {
            return Some(self.root.clone());
        }
        self.index
            .get(media_id)
            .and_then(|position| self.children.get(*position))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(ids: &[&str]) -> BrowseTree {
        let items = ids
            .iter()
            .map(|id| MediaItem::builder(*id).title(id.to_uppercase()).playable(true).build())
            .collect();
        BrowseTree::new(Arc::new(items))
    }

    #[test]
    fn root_is_browsable_container() {
        let tree = tree(&["a"]);
        assert_eq!(tree.root().media_id, MEDIA_ROOT_ID);
        assert!(tree.root().is_browsable());
        assert!(!tree.root().is_playable());
        assert_eq!(tree.item(MEDIA_ROOT_ID).unwrap(), *tree.root());
    }

    #[test]
    fn children_of_root_keep_order() {
        let tree = tree(&["b", "a", "c"]);
        let ids: Vec<_> = tree
            .children(MEDIA_ROOT_ID)
            .into_iter()
            .map(|item| item.media_id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(tree.children("b").is_empty());
        assert!(tree.children("missing").is_empty());
    }

    #[test]
    fn pages_are_bounded() {
        let tree = tree(&["1", "2", "3", "4", "5"]);
        assert_eq!(tree.children_page(MEDIA_ROOT_ID, 0, 2).len(), 2);
        assert_eq!(tree.children_page(MEDIA_ROOT_ID, 2, 2).len(), 1);
        assert!(tree.children_page(MEDIA_ROOT_ID, 3, 2).is_empty());
        assert!(tree.children_page(MEDIA_ROOT_ID, 0, 0).is_empty());
    }

    #[test]
    fn item_lookup_by_id() {
        let tree = tree(&["a", "b"]);
        assert_eq!(tree.item("b").unwrap().metadata.title.as_deref(), Some("B"));
        assert!(tree.item("zzz").is_none());
        assert_eq!(tree.len(), 2);
    }
}
