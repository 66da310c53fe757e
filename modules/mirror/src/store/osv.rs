use super::{dedup_keep_last, Error};
use knowledge_common::db::{chunk::chunked, Database};
use knowledge_entity::osv;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Iterable, TransactionTrait};
use sea_query::OnConflict;
use tracing::instrument;

/// Upsert a batch of OSV advisories, keyed on `osv_id`, atomically.
#[instrument(skip_all, fields(items = items.len()), err)]
pub async fn batch_upsert(db: &Database, items: Vec<osv::Model>) -> Result<(), Error> {
    if items.is_empty() {
        return Ok(());
    }

    let items = dedup_keep_last(items, |item| item.osv_id.clone());

    let tx = db.begin().await?;

    let models = items
        .into_iter()
        .map(|item| item.into_active_model().reset_all())
        .collect();

    for chunk in chunked(models) {
        osv::Entity::insert_many(chunk)
            .on_conflict(
                OnConflict::column(osv::Column::OsvId)
                    .update_columns(
                        osv::Column::iter().filter(|column| {
                            !matches!(column, osv::Column::Id | osv::Column::OsvId)
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

pub async fn upsert(db: &Database, item: osv::Model) -> Result<(), Error> {
    batch_upsert(db, vec![item]).await
}
