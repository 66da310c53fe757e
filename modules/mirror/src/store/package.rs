use super::{dedup_keep_last, Error};
use knowledge_common::{
    db::{chunk::chunked, Database},
    version,
};
use knowledge_entity::{package, package_version};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, IntoActiveModel, Iterable,
    QueryFilter, QuerySelect, TransactionTrait,
};
use sea_query::OnConflict;
use std::collections::{HashMap, HashSet};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

/// A normalised package together with its versions, as produced by a
/// registry adapter. The adapter does not talk to the database; this is
/// the hand-over type.
#[derive(Clone, Debug)]
pub struct PackageRecord {
    pub package: package::Model,
    pub versions: Vec<VersionInfo>,
}

#[derive(Clone, Debug)]
pub struct VersionInfo {
    pub version: String,
    pub dependencies: package_version::DependencyMap,
    pub dev_dependencies: package_version::DependencyMap,
    pub extra: serde_json::Value,
}

/// Versions of a package that were not known before this write.
#[derive(Clone, Debug)]
pub struct NewVersions {
    pub name: String,
    pub versions: Vec<String>,
}

/// All package names known for a language.
pub async fn names_by_language(db: &Database, language: &str) -> Result<Vec<String>, Error> {
    Ok(package::Entity::find()
        .select_only()
        .column(package::Column::Name)
        .filter(package::Column::Language.eq(language))
        .into_tuple()
        .all(db)
        .await?)
}

/// Which of `names` were already refreshed after `cutoff`.
///
/// A single `IN` query; the follow mirrors use this to skip network round
/// trips for packages fetched within the last four hours.
pub async fn fresh_names(
    db: &Database,
    language: &str,
    names: &[String],
    cutoff: OffsetDateTime,
) -> Result<HashSet<String>, Error> {
    if names.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<String> = package::Entity::find()
        .select_only()
        .column(package::Column::Name)
        .filter(package::Column::Language.eq(language))
        .filter(package::Column::Name.is_in(names.iter().cloned()))
        .filter(package::Column::Time.gt(cutoff))
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows.into_iter().collect())
}

pub async fn upsert(db: &Database, record: PackageRecord) -> Result<Vec<NewVersions>, Error> {
    let language = record.package.language.clone();
    batch_upsert(db, &language, vec![record]).await
}

/// Upsert packages and their versions in one transaction.
///
/// Package rows are keyed on `(name, language)`, version rows on
/// `(package_id, version)`. Pre-release versions are dropped before they
/// reach the version table. The returned list names the versions that did
/// not exist before the call, which feeds the update notifications.
#[instrument(skip_all, fields(language, records = records.len()), err)]
pub async fn batch_upsert(
    db: &Database,
    language: &str,
    records: Vec<PackageRecord>,
) -> Result<Vec<NewVersions>, Error> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let records = dedup_keep_last(records, |record| record.package.name.clone());
    let names: Vec<String> = records
        .iter()
        .map(|record| record.package.name.clone())
        .collect();

    let tx = db.begin().await?;

    // package rows

    let models = records
        .iter()
        .map(|record| record.package.clone().into_active_model().reset_all())
        .collect();

    for chunk in chunked(models) {
        package::Entity::insert_many(chunk)
            .on_conflict(
                OnConflict::columns([package::Column::Name, package::Column::Language])
                    .update_columns(package::Column::iter().filter(|column| {
                        !matches!(
                            column,
                            package::Column::Id
                                | package::Column::Name
                                | package::Column::Language
                        )
                    }))
                    .to_owned(),
            )
            .exec(&tx)
            .await?;
    }

    // resolve surrogate ids

    let ids: HashMap<String, Uuid> = package::Entity::find()
        .select_only()
        .column(package::Column::Name)
        .column(package::Column::Id)
        .filter(package::Column::Language.eq(language))
        .filter(package::Column::Name.is_in(names))
        .into_tuple::<(String, Uuid)>()
        .all(&tx)
        .await?
        .into_iter()
        .collect();

    // load what versions we already know, one query for the whole batch

    let mut known: HashMap<Uuid, HashSet<String>> = HashMap::new();
    if !ids.is_empty() {
        let rows: Vec<(Uuid, String)> = package_version::Entity::find()
            .select_only()
            .column(package_version::Column::PackageId)
            .column(package_version::Column::Version)
            .filter(
                package_version::Column::PackageId.is_in(ids.values().copied()),
            )
            .into_tuple()
            .all(&tx)
            .await?;

        for (package_id, version) in rows {
            known.entry(package_id).or_default().insert(version);
        }
    }

    // version rows, stable releases only

    let now = OffsetDateTime::now_utc();
    let mut new_versions: Vec<NewVersions> = Vec::new();
    let mut models: Vec<package_version::ActiveModel> = Vec::new();

    for record in records {
        let Some(&package_id) = ids.get(&record.package.name) else {
            continue;
        };
        let known = known.get(&package_id);

        let mut fresh = Vec::new();
        let versions = dedup_keep_last(record.versions, |version| version.version.clone());

        for version in versions {
            if version::is_prerelease(&version.version) {
                continue;
            }

            if !known.is_some_and(|known| known.contains(&version.version)) {
                fresh.push(version.version.clone());
            }

            models.push(package_version::ActiveModel {
                id: Set(Uuid::new_v4()),
                package_id: Set(package_id),
                version: Set(version.version),
                dependencies: Set(version.dependencies),
                dev_dependencies: Set(version.dev_dependencies),
                extra: Set(version.extra),
                updated_at: Set(now),
            });
        }

        if !fresh.is_empty() {
            new_versions.push(NewVersions {
                name: record.package.name,
                versions: fresh,
            });
        }
    }

    for chunk in chunked(models) {
        package_version::Entity::insert_many(chunk)
            .on_conflict(
                OnConflict::columns([
                    package_version::Column::PackageId,
                    package_version::Column::Version,
                ])
                .update_columns([
                    package_version::Column::Dependencies,
                    package_version::Column::DevDependencies,
                    package_version::Column::Extra,
                    package_version::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&tx)
            .await?;
    }

    tx.commit().await?;

    Ok(new_versions)
}
