use sea_orm::{ActiveModelTrait, EntityTrait, Iterable};

/// PostgreSQL limits a prepared statement to `u16::MAX` bind parameters;
/// keep some headroom for parameters outside the value lists.
const MAX_PARAMETERS: usize = (u16::MAX - 128) as usize;

/// Split a batch of active models into chunks that fit into a single
/// `insert_many` statement.
///
/// The chunk size is derived from the number of columns of the entity, so
/// wide entities get smaller chunks. An entity wider than the parameter
/// limit yields chunks of one, which fails loudly on execution instead of
/// silently truncating.
pub fn chunked<M>(items: Vec<M>) -> impl Iterator<Item = Vec<M>>
where
    M: ActiveModelTrait,
{
    let values = <M::Entity as EntityTrait>::Column::iter().count().max(1);
    let size = (MAX_PARAMETERS / values).max(1);

    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(size.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.into_iter()
}

#[cfg(test)]
mod test {
    use super::*;
    use knowledge_entity::mirror_state;
    use sea_orm::ActiveValue::Set;

    fn state(name: &str) -> mirror_state::ActiveModel {
        mirror_state::ActiveModel {
            name: Set(name.to_string()),
            cursor: Set(None),
        }
    }

    #[test]
    fn small_batches_stay_in_one_chunk() {
        let chunks: Vec<_> = chunked(vec![state("a"), state("b"), state("c")]).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 3);
    }

    #[test]
    fn empty_batches_yield_no_chunks() {
        let chunks: Vec<_> = chunked(Vec::<mirror_state::ActiveModel>::new()).collect();
        assert!(chunks.is_empty());
    }
}
