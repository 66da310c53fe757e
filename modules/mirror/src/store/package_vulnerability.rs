use super::{dedup_keep_last, Error};
use knowledge_common::db::{chunk::chunked, Database};
use knowledge_entity::package_vulnerability;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, TransactionTrait};
use sea_query::OnConflict;
use tracing::instrument;
use uuid::Uuid;

/// Insert package→vulnerability edges.
///
/// Uniqueness is `(package_name, package_ecosystem, <populated fk>)`,
/// enforced by partial unique indexes; an edge that already exists is
/// left untouched. The in-batch dedup keys on the same triple so a
/// single statement never hits the same edge twice.
#[instrument(skip_all, fields(items = items.len()), err)]
pub async fn insert_links(
    db: &Database,
    items: Vec<package_vulnerability::Model>,
) -> Result<(), Error> {
    if items.is_empty() {
        return Ok(());
    }

    let items = dedup_keep_last(items, link_key);
    let tx = db.begin().await?;

    let models = items
        .into_iter()
        .map(|item| item.into_active_model().reset_all())
        .collect();

    for chunk in chunked(models) {
        package_vulnerability::Entity::insert_many(chunk)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .do_nothing()
            .exec(&tx)
            .await?;
    }

    tx.commit().await?;

    Ok(())
}

fn link_key(item: &package_vulnerability::Model) -> (String, String, Option<Uuid>) {
    let fk = item
        .gcve_id
        .or(item.osv_id)
        .or(item.friends_of_php_id)
        .or(item.nvd_id);

    (item.package_name.clone(), item.package_ecosystem.clone(), fk)
}

#[cfg(test)]
mod test {
    use super::*;

    fn link(name: &str, ecosystem: &str, gcve: Uuid) -> package_vulnerability::Model {
        package_vulnerability::Model {
            id: Uuid::new_v4(),
            package_name: name.into(),
            package_ecosystem: ecosystem.into(),
            gcve_id: Some(gcve),
            osv_id: None,
            friends_of_php_id: None,
            nvd_id: None,
        }
    }

    #[test]
    fn dedup_keys_on_name_ecosystem_and_fk() {
        let vuln_a = Uuid::new_v4();
        let vuln_b = Uuid::new_v4();

        let links = vec![
            link("openssl", "gcve", vuln_a),
            link("openssl", "gcve", vuln_a),
            link("openssl", "gcve", vuln_b),
            link("curl", "gcve", vuln_a),
        ];

        let deduped = dedup_keep_last(links, link_key);
        assert_eq!(deduped.len(), 3);
    }
}
