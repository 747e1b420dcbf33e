use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Position of the element being rendered within a collection.
///
/// Bound into each element's locals under `<variable>_iteration`, where
/// templates see `index`, `size`, `first` and `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialIteration {
    size: usize,
    index: usize,
}

impl PartialIteration {
    pub fn new(size: usize) -> Self {
        Self { size, index: 0 }
    }

    /// Number of elements in the collection.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Zero-based index of the current element.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the current element is the first one.
    pub fn first(&self) -> bool {
        self.index == 0
    }

    /// Whether the current element is the last one.
    pub fn last(&self) -> bool {
        self.index + 1 == self.size
    }

    /// Advances to the next element. Callers stop at `size - 1`.
    pub fn iterate(&mut self) {
        self.index += 1;
    }
}

impl Serialize for PartialIteration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PartialIteration", 4)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("first", &self.first())?;
        state.serialize_field("last", &self.last())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_last() {
        let mut iteration = PartialIteration::new(3);
        assert!(iteration.first());
        assert!(!iteration.last());

        iteration.iterate();
        assert!(!iteration.first());
        assert!(!iteration.last());

        iteration.iterate();
        assert_eq!(iteration.index(), 2);
        assert!(iteration.last());
    }

    #[test]
    fn test_single_element_is_first_and_last() {
        let iteration = PartialIteration::new(1);
        assert!(iteration.first());
        assert!(iteration.last());
    }

    #[test]
    fn test_serializes_predicates() {
        let mut iteration = PartialIteration::new(2);
        iteration.iterate();
        assert_eq!(
            serde_json::to_value(iteration).unwrap(),
            serde_json::json!({"index": 1, "size": 2, "first": false, "last": true})
        );
    }
}
