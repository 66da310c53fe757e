use super::{dedup_keep_last, Error};
use knowledge_common::db::{chunk::chunked, Database};
use knowledge_entity::friends_of_php;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, Iterable, QueryFilter,
    QuerySelect, TransactionTrait,
};
use sea_query::OnConflict;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Upsert a batch of FriendsOfPHP advisories, keyed on `advisory_id`,
/// atomically.
#[instrument(skip_all, fields(items = items.len()), err)]
pub async fn batch_upsert(db: &Database, items: Vec<friends_of_php::Model>) -> Result<(), Error> {
    if items.is_empty() {
        return Ok(());
    }

    let items = dedup_keep_last(items, |item| item.advisory_id.clone());

    let tx = db.begin().await?;

    let models = items
        .into_iter()
        .map(|item| item.into_active_model().reset_all())
        .collect();

    for chunk in chunked(models) {
        friends_of_php::Entity::insert_many(chunk)
            .on_conflict(
                OnConflict::column(friends_of_php::Column::AdvisoryId)
                    .update_columns(friends_of_php::Column::iter().filter(|column| {
                        !matches!(
                            column,
                            friends_of_php::Column::Id | friends_of_php::Column::AdvisoryId
                        )
                    }))
                    .to_owned(),
            )
            .exec(&tx)
            .await?;
    }

    tx.commit().await?;

    Ok(())
}

pub async fn upsert(db: &Database, item: friends_of_php::Model) -> Result<(), Error> {
    batch_upsert(db, vec![item]).await
}

/// Resolve the surrogate UUIDs for a set of advisory identifiers.
pub async fn lookup_ids(
    db: &Database,
    advisory_ids: &[String],
) -> Result<HashMap<String, Uuid>, Error> {
    if advisory_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(String, Uuid)> = friends_of_php::Entity::find()
        .select_only()
        .column(friends_of_php::Column::AdvisoryId)
        .column(friends_of_php::Column::Id)
        .filter(friends_of_php::Column::AdvisoryId.is_in(advisory_ids.iter().cloned()))
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows.into_iter().collect())
}
