//! Height-activated lookup tables.
//!
//! An [`EraTable`] holds values that take effect at a given block height and stay
//! in force until the next activation. Lookups select the entry with the largest
//! activation height that is still `<=` the queried height.

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Era<T> {
    pub activation_height: i32,
    pub value: T,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EraTable<T> {
    eras: Vec<Era<T>>,
}

impl<T> EraTable<T> {
    /// Builds a table from `(activation_height, value)` pairs in any order.
    ///
    /// When two entries share an activation height the one listed last wins.
    pub fn new(entries: impl IntoIterator<Item = (i32, T)>) -> Self {
        let mut eras: Vec<Era<T>> = entries
            .into_iter()
            .map(|(activation_height, value)| Era {
                activation_height,
                value,
            })
            .collect();
        eras.sort_by_key(|era| era.activation_height);
        Self { eras }
    }

    pub fn at(&self, height: i32) -> Option<&T> {
        self.era_at(height).map(|era| &era.value)
    }

    pub fn era_at(&self, height: i32) -> Option<&Era<T>> {
        let end = self
            .eras
            .partition_point(|era| era.activation_height <= height);
        end.checked_sub(1).map(|index| &self.eras[index])
    }

    pub fn activation_heights(&self) -> impl Iterator<Item = i32> + '_ {
        self.eras.iter().map(|era| era.activation_height)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Era<T>> {
        self.eras.iter()
    }

    pub fn len(&self) -> usize {
        self.eras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eras.is_empty()
    }
}
