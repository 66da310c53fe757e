//! Typed upserts and batch upserts for every mirrored entity.
//!
//! All writes go through `INSERT .. ON CONFLICT` keyed on the entity's
//! natural key: the check-then-act alternative is not atomic and races
//! with concurrent workers. Batches are deduplicated by natural key
//! first, keeping the **last** occurrence, because PostgreSQL refuses to
//! update the same row twice within one statement.

pub mod cursor;
pub mod cwe;
pub mod epss;
pub mod friends_of_php;
pub mod gcve;
pub mod license;
pub mod nvd;
pub mod osv;
pub mod package;
pub mod package_vulnerability;

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Deduplicate a batch by key, keeping the value of the last occurrence
/// at the position of the first.
pub(crate) fn dedup_keep_last<T, K>(items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T>
where
    K: Eq + Hash,
{
    let mut seen: HashMap<K, usize> = HashMap::with_capacity(items.len());
    let mut result: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        match seen.get(&key(&item)) {
            Some(&index) => result[index] = item,
            None => {
                seen.insert(key(&item), result.len());
                result.push(item);
            }
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_last_occurrence_at_first_position() {
        let items = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        let deduped = dedup_keep_last(items, |(k, _)| *k);
        assert_eq!(deduped, vec![("a", 3), ("b", 5), ("c", 4)]);
    }
}
