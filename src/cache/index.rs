use std::collections::HashMap;

use crate::models::Restaurant;

/// Secondary lookup structures over one restaurant snapshot.
///
/// Built whenever a snapshot is committed and discarded with it, so the
/// indexes can never disagree with the records they point into. Positions
/// are offsets into the snapshot's record vector, kept in storage order.
#[derive(Debug, Default)]
pub struct RestaurantIndex {
    by_id: HashMap<i64, usize>,
    by_cuisine: HashMap<String, Vec<usize>>,
    by_neighborhood: HashMap<String, Vec<usize>>,
    by_cuisine_and_neighborhood: HashMap<(String, String), Vec<usize>>,
    /// Distinct cuisine values in first-seen order.
    cuisines: Vec<String>,
    /// Distinct neighborhood values in first-seen order.
    neighborhoods: Vec<String>,
}

impl RestaurantIndex {
    pub fn build(records: &[Restaurant]) -> Self {
        let mut index = Self::default();

        for (pos, r) in records.iter().enumerate() {
            index.by_id.insert(r.id, pos);

            let cuisine_slot = index.by_cuisine.entry(r.cuisine_type.clone()).or_default();
            if cuisine_slot.is_empty() {
                index.cuisines.push(r.cuisine_type.clone());
            }
            cuisine_slot.push(pos);

            let hood_slot = index
                .by_neighborhood
                .entry(r.neighborhood.clone())
                .or_default();
            if hood_slot.is_empty() {
                index.neighborhoods.push(r.neighborhood.clone());
            }
            hood_slot.push(pos);

            index
                .by_cuisine_and_neighborhood
                .entry((r.cuisine_type.clone(), r.neighborhood.clone()))
                .or_default()
                .push(pos);
        }

        index
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn cuisine_positions(&self, cuisine: &str) -> &[usize] {
        self.by_cuisine
            .get(cuisine)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn neighborhood_positions(&self, neighborhood: &str) -> &[usize] {
        self.by_neighborhood
            .get(neighborhood)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Exact tuple match on (cuisine_type, neighborhood). Not the same as
    /// intersecting the two single-field lookups: both fields must match on
    /// the same record.
    pub fn compound_positions(&self, cuisine: &str, neighborhood: &str) -> &[usize] {
        self.by_cuisine_and_neighborhood
            .get(&(cuisine.to_string(), neighborhood.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cuisines(&self) -> &[String] {
        &self.cuisines
    }

    pub fn neighborhoods(&self) -> &[String] {
        &self.neighborhoods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(id: i64, cuisine: &str, neighborhood: &str) -> Restaurant {
        Restaurant {
            id,
            name: format!("Restaurant {}", id),
            neighborhood: neighborhood.to_string(),
            address: "1 Main St".to_string(),
            latlng: Default::default(),
            cuisine_type: cuisine.to_string(),
            photograph: None,
            operating_hours: Default::default(),
            is_favorite: false,
        }
    }

    fn sample() -> Vec<Restaurant> {
        vec![
            restaurant(1, "Italian", "Manhattan"),
            restaurant(2, "Italian", "Brooklyn"),
            restaurant(3, "Asian", "Manhattan"),
            restaurant(4, "Italian", "Manhattan"),
        ]
    }

    #[test]
    fn test_position_by_id() {
        let records = sample();
        let index = RestaurantIndex::build(&records);
        assert_eq!(index.position(3), Some(2));
        assert_eq!(index.position(99), None);
    }

    #[test]
    fn test_single_field_lookup_in_storage_order() {
        let records = sample();
        let index = RestaurantIndex::build(&records);
        assert_eq!(index.cuisine_positions("Italian"), &[0, 1, 3]);
        assert_eq!(index.neighborhood_positions("Manhattan"), &[0, 2, 3]);
        assert!(index.cuisine_positions("French").is_empty());
    }

    #[test]
    fn test_compound_lookup_requires_both_fields() {
        let records = sample();
        let index = RestaurantIndex::build(&records);
        // Italian/Brooklyn (id 2) must be excluded from Italian/Manhattan.
        assert_eq!(index.compound_positions("Italian", "Manhattan"), &[0, 3]);
        assert_eq!(index.compound_positions("Italian", "Brooklyn"), &[1]);
        assert!(index.compound_positions("Asian", "Brooklyn").is_empty());
    }

    #[test]
    fn test_distinct_values_first_seen_order_no_duplicates() {
        let records = sample();
        let index = RestaurantIndex::build(&records);
        assert_eq!(index.cuisines(), &["Italian".to_string(), "Asian".to_string()]);
        assert_eq!(
            index.neighborhoods(),
            &["Manhattan".to_string(), "Brooklyn".to_string()]
        );
    }

    #[test]
    fn test_union_of_index_values_covers_collection() {
        let records = sample();
        let index = RestaurantIndex::build(&records);
        let mut covered: Vec<usize> = index
            .cuisines()
            .iter()
            .flat_map(|c| index.cuisine_positions(c).to_vec())
            .collect();
        covered.sort_unstable();
        assert_eq!(covered, (0..records.len()).collect::<Vec<_>>());
    }
}
