use super::{dedup_keep_last, Error};
use knowledge_common::db::{chunk::chunked, Database};
use knowledge_entity::cwe;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Iterable, TransactionTrait};
use sea_query::OnConflict;
use tracing::instrument;

/// Upsert the flattened CWE catalog, keyed on `cwe_id`, atomically.
#[instrument(skip_all, fields(items = items.len()), err)]
pub async fn batch_upsert(db: &Database, items: Vec<cwe::Model>) -> Result<(), Error> {
    if items.is_empty() {
        return Ok(());
    }

    let items = dedup_keep_last(items, |item| item.cwe_id.clone());

    let tx = db.begin().await?;

    let models = items
        .into_iter()
        .map(|item| item.into_active_model().reset_all())
        .collect();

    for chunk in chunked(models) {
        cwe::Entity::insert_many(chunk)
            .on_conflict(
                OnConflict::column(cwe::Column::CweId)
                    .update_columns(
                        cwe::Column::iter().filter(|column| {
                            !matches!(column, cwe::Column::Id | cwe::Column::CweId)
                        }),
                    )
                    .to_owned(),
            )
            .exec(&tx)
            .await?;
    }

    tx.commit().await?;

    Ok(())
}
