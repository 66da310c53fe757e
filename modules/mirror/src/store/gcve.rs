use super::{dedup_keep_last, Error};
use knowledge_common::db::{chunk::chunked, Database};
use knowledge_entity::gcve;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, Iterable, QueryFilter,
    QuerySelect, TransactionTrait,
};
use sea_query::OnConflict;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Upsert a batch of CVE records, keyed on `gcve_id`, atomically.
#[instrument(skip_all, fields(items = items.len()), err)]
pub async fn batch_upsert(db: &Database, items: Vec<gcve::Model>) -> Result<(), Error> {
    if items.is_empty() {
        return Ok(());
    }

    let items = dedup_keep_last(items, |item| item.gcve_id.clone());

    let tx = db.begin().await?;

    let models = items
        .into_iter()
        .map(|item| item.into_active_model().reset_all())
        .collect();

    for chunk in chunked(models) {
        gcve::Entity::insert_many(chunk)
            .on_conflict(
                OnConflict::column(gcve::Column::GcveId)
                    .update_columns(gcve::Column::iter().filter(|column| {
                        !matches!(column, gcve::Column::Id | gcve::Column::GcveId)
                    }))
                    .to_owned(),
            )
            .exec(&tx)
            .await?;
    }

    tx.commit().await?;

    Ok(())
}

pub async fn upsert(db: &Database, item: gcve::Model) -> Result<(), Error> {
    batch_upsert(db, vec![item]).await
}

/// Resolve the surrogate UUIDs for a set of CVE identifiers.
pub async fn lookup_ids(
    db: &Database,
    gcve_ids: &[String],
) -> Result<HashMap<String, Uuid>, Error> {
    if gcve_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(String, Uuid)> = gcve::Entity::find()
        .select_only()
        .column(gcve::Column::GcveId)
        .column(gcve::Column::Id)
        .filter(gcve::Column::GcveId.is_in(gcve_ids.iter().cloned()))
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows.into_iter().collect())
}
