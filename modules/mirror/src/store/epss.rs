use super::{dedup_keep_last, Error};
use knowledge_common::db::{chunk::chunked, Database};
use knowledge_entity::epss;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, TransactionTrait};
use sea_query::OnConflict;
use tracing::instrument;

/// Upsert the full EPSS score feed, keyed on `cve`, atomically.
#[instrument(skip_all, fields(items = items.len()), err)]
pub async fn batch_upsert(db: &Database, items: Vec<epss::Model>) -> Result<(), Error> {
    if items.is_empty() {
        return Ok(());
    }

    let items = dedup_keep_last(items, |item| item.cve.clone());

    let tx = db.begin().await?;

    let models = items
        .into_iter()
        .map(|item| item.into_active_model().reset_all())
        .collect();

    for chunk in chunked(models) {
        epss::Entity::insert_many(chunk)
            .on_conflict(
                OnConflict::column(epss::Column::Cve)
                    .update_columns([epss::Column::Score, epss::Column::Percentile])
                    .to_owned(),
            )
            .exec(&tx)
            .await?;
    }

    tx.commit().await?;

    Ok(())
}
