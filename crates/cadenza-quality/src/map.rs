use std::collections::{BTreeMap, btree_map};

/// Quality per representation id.
///
/// `None` means the quality is unknown; it never stands for zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QualityMap(BTreeMap<String, Option<f64>>);

impl QualityMap {
    pub fn insert(&mut self, representation_id: impl Into<String>, quality: Option<f64>) {
        self.0.insert(representation_id.into(), quality);
    }

    /// Known quality of `representation_id`.
    pub fn get(&self, representation_id: &str) -> Option<f64> {
        self.0.get(representation_id).copied().flatten()
    }

    pub fn contains(&self, representation_id: &str) -> bool {
        self.0.contains_key(representation_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Option<f64>> {
        self.0.iter()
    }

    /// Same representations with the same qualities.
    pub fn same_as(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|(id, quality)| other.0.get(id).is_some_and(|q| q == quality))
    }
}

impl<'a> IntoIterator for &'a QualityMap {
    type Item = (&'a String, &'a Option<f64>);
    type IntoIter = btree_map::Iter<'a, String, Option<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Option<f64>)> for QualityMap {
    fn from_iter<I: IntoIterator<Item = (S, Option<f64>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, q)| (id.into(), q)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_is_not_zero() {
        let map: QualityMap = [("low", None), ("mid", Some(0.0))].into_iter().collect();
        assert_eq!(map.get("low"), None);
        assert_eq!(map.get("mid"), Some(0.0));
        assert!(map.contains("low"));
        assert!(!map.contains("high"));
    }

    #[test]
    fn same_as_compares_keys_and_values() {
        let a: QualityMap = [("low", None), ("mid", Some(0.9))].into_iter().collect();
        let b = a.clone();
        let other_value: QualityMap = [("low", Some(0.9)), ("mid", Some(0.9))].into_iter().collect();
        let other_keys: QualityMap = [("low", None)].into_iter().collect();
        let renamed: QualityMap = [("low", None), ("high", Some(0.9))].into_iter().collect();

        assert!(a.same_as(&b));
        assert!(!a.same_as(&other_value));
        assert!(!a.same_as(&other_keys));
        assert!(!other_keys.same_as(&a));
        assert!(!a.same_as(&renamed));
    }
}
