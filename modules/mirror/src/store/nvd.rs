use super::{dedup_keep_last, Error};
use knowledge_common::db::{chunk::chunked, Database};
use knowledge_entity::nvd;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Iterable, TransactionTrait};
use sea_query::OnConflict;
use tracing::instrument;

/// Upsert a page worth of NVD records, keyed on `nvd_id`, atomically.
#[instrument(skip_all, fields(items = items.len()), err)]
pub async fn batch_upsert(db: &Database, items: Vec<nvd::Model>) -> Result<(), Error> {
    if items.is_empty() {
        return Ok(());
    }

    let items = dedup_keep_last(items, |item| item.nvd_id.clone());

    let tx = db.begin().await?;

    let models = items
        .into_iter()
        .map(|item| item.into_active_model().reset_all())
        .collect();

    for chunk in chunked(models) {
        nvd::Entity::insert_many(chunk)
            .on_conflict(
                OnConflict::column(nvd::Column::NvdId)
                    .update_columns(
                        nvd::Column::iter().filter(|column| {
                            !matches!(column, nvd::Column::Id | nvd::Column::NvdId)
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

pub async fn upsert(db: &Database, item: nvd::Model) -> Result<(), Error> {
    batch_upsert(db, vec![item]).await
}
