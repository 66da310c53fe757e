use knowledge_common::db::Database;
use knowledge_entity::mirror_state;
use sea_orm::{ActiveValue::Set, EntityTrait};
use sea_query::OnConflict;
use time::OffsetDateTime;

/// Read a mirror's cursor. `None` means the mirror has never completed a
/// run.
pub async fn read(db: &Database, mirror: &str) -> Result<Option<OffsetDateTime>, sea_orm::DbErr> {
    Ok(mirror_state::Entity::find_by_id(mirror)
        .one(db)
        .await?
        .and_then(|state| state.cursor))
}

/// Advance a mirror's cursor.
///
/// Written only after a successful run, from the orchestrator thread,
/// once all workers have drained. Values only move forward.
pub async fn write(
    db: &Database,
    mirror: &str,
    cursor: OffsetDateTime,
) -> Result<(), sea_orm::DbErr> {
    mirror_state::Entity::insert(mirror_state::ActiveModel {
        name: Set(mirror.to_string()),
        cursor: Set(Some(cursor)),
    })
    .on_conflict(
        OnConflict::column(mirror_state::Column::Name)
            .update_column(mirror_state::Column::Cursor)
            .to_owned(),
    )
    .exec(db)
    .await?;

    Ok(())
}
