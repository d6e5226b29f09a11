use crate::storage::FileUpload;

/// Fixed image positions of an entity, numbered from 1. Category and Poster
/// have a single slot, Product has five.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSet {
    slots: Vec<Option<String>>,
}

impl ImageSet {
    pub fn empty(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn single(url: Option<String>) -> Self {
        Self { slots: vec![url] }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|index| self.slots.get(index))
            .and_then(|url| url.as_deref())
    }

    /// Returns false when `slot` is outside `1..=capacity`.
    pub fn set(&mut self, slot: usize, url: Option<String>) -> bool {
        match slot.checked_sub(1).and_then(|index| self.slots.get_mut(index)) {
            Some(entry) => {
                *entry = url;
                true
            }
            None => false,
        }
    }

    /// Populated slots as `(slot, url)`, ascending.
    pub fn populated(&self) -> impl Iterator<Item = (usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, url)| url.as_deref().map(|u| (index + 1, u)))
    }

    pub fn urls(&self) -> Vec<String> {
        self.populated().map(|(_, url)| url.to_string()).collect()
    }
}

/// An entity whose documents reference images in the object store.
pub trait ImageOwner {
    const SLOTS: usize;

    fn image_set(&self) -> ImageSet;

    /// Every asset URL the stored document references, including entries
    /// that do not map onto a valid slot.
    fn asset_urls(&self) -> Vec<String> {
        self.image_set().urls()
    }
}

/// A file supplied for one slot in a mutating request.
#[derive(Debug, Clone)]
pub struct SlotUpload {
    pub slot: usize,
    pub file: FileUpload,
}

impl SlotUpload {
    pub fn new(slot: usize, file: FileUpload) -> Self {
        Self { slot, file }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_one_based() {
        let mut set = ImageSet::empty(5);
        assert!(set.set(1, Some("a".into())));
        assert!(set.set(5, Some("e".into())));
        assert!(!set.set(0, Some("x".into())));
        assert!(!set.set(6, Some("x".into())));

        assert_eq!(set.get(1), Some("a"));
        assert_eq!(set.get(0), None);
        assert_eq!(set.populated().map(|(s, _)| s).collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn single_slot_set() {
        assert_eq!(ImageSet::single(None).urls(), Vec::<String>::new());
        assert_eq!(ImageSet::single(Some("u".into())).urls(), vec!["u".to_string()]);
    }
}
