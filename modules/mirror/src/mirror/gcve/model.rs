//! CVE Record v5 parsing, as distributed by vulnerability-lookup.

use knowledge_entity::{gcve, package_vulnerability};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveRecord {
    #[serde(default)]
    pub data_version: String,
    pub cve_metadata: CveMetadata,
    #[serde(default)]
    pub containers: Containers,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveMetadata {
    pub cve_id: String,
    #[serde(default)]
    pub assigner_org_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub date_published: String,
    #[serde(default)]
    pub date_updated: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Containers {
    #[serde(default)]
    pub cna: serde_json::Value,
    #[serde(default)]
    pub adp: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CnaContainer {
    #[serde(default)]
    affected: Vec<serde_json::Value>,
    #[serde(default)]
    descriptions: Vec<gcve::Description>,
    #[serde(default)]
    metrics: Vec<serde_json::Value>,
    #[serde(default)]
    problem_types: Vec<gcve::ProblemType>,
    #[serde(default)]
    references: Vec<gcve::Reference>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdpContainer {
    #[serde(default)]
    provider_metadata: ProviderMetadata,
    #[serde(default)]
    title: String,
    #[serde(default)]
    affected: Vec<serde_json::Value>,
    #[serde(default)]
    metrics: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderMetadata {
    #[serde(default)]
    org_id: String,
    #[serde(default)]
    short_name: String,
}

/// Parse one NDJSON line. `Ok(None)` means the record is `REJECTED` and
/// must be discarded.
pub fn parse_record(data: &[u8]) -> Result<Option<gcve::Model>, serde_json::Error> {
    Ok(convert(serde_json::from_slice(data)?))
}

/// Same as [`parse_record`], for records arriving as JSON values from
/// the incremental API.
pub fn parse_value(value: serde_json::Value) -> Result<Option<gcve::Model>, serde_json::Error> {
    Ok(convert(serde_json::from_value(value)?))
}

fn convert(raw: CveRecord) -> Option<gcve::Model> {
    if raw.cve_metadata.state == "REJECTED" {
        return None;
    }

    let cna: CnaContainer = match raw.containers.cna {
        serde_json::Value::Null => CnaContainer::default(),
        value => serde_json::from_value(value).unwrap_or_default(),
    };

    // individual affected entries may be malformed; drop those alone
    let affected: Vec<gcve::Affected> = cna
        .affected
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();

    let adp_enrichments: Vec<gcve::Adp> = raw
        .containers
        .adp
        .into_iter()
        .filter_map(|value| serde_json::from_value::<AdpContainer>(value).ok())
        .map(|adp| gcve::Adp {
            provider_org_id: adp.provider_metadata.org_id,
            short_name: adp.provider_metadata.short_name,
            title: adp.title,
            affected: adp
                .affected
                .into_iter()
                .filter_map(|value| serde_json::from_value(value).ok())
                .collect(),
            metrics: serde_json::Value::Array(adp.metrics),
        })
        .collect();

    let affected_flattened = flatten_affected(
        affected
            .iter()
            .chain(adp_enrichments.iter().flat_map(|adp| adp.affected.iter())),
    );

    let cwes = extract_cwe_ids(&cna.problem_types);

    Some(gcve::Model {
        id: Uuid::new_v4(),
        gcve_id: raw.cve_metadata.cve_id.clone(),
        cve_id: raw.cve_metadata.cve_id,
        data_version: raw.data_version,
        state: raw.cve_metadata.state,
        date_published: raw.cve_metadata.date_published,
        date_updated: raw.cve_metadata.date_updated,
        assigner_org_id: raw.cve_metadata.assigner_org_id,
        descriptions: gcve::Descriptions(cna.descriptions),
        affected: gcve::AffectedList(affected),
        affected_flattened: gcve::Products(affected_flattened),
        metrics: serde_json::Value::Array(cna.metrics),
        problem_types: gcve::ProblemTypes(cna.problem_types),
        references: gcve::References(cna.references),
        adp_enrichments: gcve::AdpEnrichments(adp_enrichments),
        cwes,
    })
}

/// The denormalised `(vendor, product)` list backing the GIN containment
/// index: lowercased, deduplicated across CNA and ADP containers, with
/// empty and wildcard products excluded.
fn flatten_affected<'a>(
    affected: impl Iterator<Item = &'a gcve::Affected>,
) -> Vec<gcve::Product> {
    let mut seen = HashSet::new();
    let mut products = Vec::new();

    for entry in affected {
        if entry.product.is_empty() || entry.product == "*" {
            continue;
        }

        let vendor = entry.vendor.to_lowercase();
        let product = entry.product.to_lowercase();

        if seen.insert((vendor.clone(), product.clone())) {
            products.push(gcve::Product { vendor, product });
        }
    }

    products
}

/// Unique CWE ids across all problem-type descriptions, in order of
/// first appearance.
fn extract_cwe_ids(problem_types: &[gcve::ProblemType]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cwes = Vec::new();

    for problem_type in problem_types {
        for description in &problem_type.descriptions {
            if !description.cwe_id.is_empty() && seen.insert(description.cwe_id.clone()) {
                cwes.push(description.cwe_id.clone());
            }
        }
    }

    cwes
}

/// Junction rows for every non-empty, non-wildcard product named by a
/// batch, deduplicated by `(name, ecosystem, record)`.
pub fn package_links(
    items: &[gcve::Model],
    ids: &HashMap<String, Uuid>,
) -> Vec<package_vulnerability::Model> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for item in items {
        let Some(&gcve_uuid) = ids.get(&item.gcve_id) else {
            continue;
        };

        let products = item
            .affected
            .0
            .iter()
            .chain(
                item.adp_enrichments
                    .0
                    .iter()
                    .flat_map(|adp| adp.affected.iter()),
            )
            .map(|affected| affected.product.as_str())
            .filter(|product| !product.is_empty() && *product != "*");

        for product in products {
            let name = product.to_lowercase();
            if !seen.insert((name.clone(), item.gcve_id.clone())) {
                continue;
            }

            links.push(package_vulnerability::Model {
                id: Uuid::new_v4(),
                package_name: name,
                package_ecosystem: "gcve".to_string(),
                gcve_id: Some(gcve_uuid),
                osv_id: None,
                friends_of_php_id: None,
                nvd_id: None,
            });
        }
    }

    links
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn record(cve_id: &str, state: &str) -> serde_json::Value {
        json!({
            "dataType": "CVE_RECORD",
            "dataVersion": "5.1",
            "cveMetadata": {
                "cveId": cve_id,
                "assignerOrgId": "org-1",
                "state": state,
                "datePublished": "2024-03-01T00:00:00Z",
                "dateUpdated": "2024-04-01T00:00:00Z"
            },
            "containers": {
                "cna": {
                    "affected": [
                        { "vendor": "Apache", "product": "Tomcat", "versions": [
                            { "version": "9.0.0", "status": "affected", "lessThan": "9.0.90", "versionType": "semver" }
                        ]},
                        { "vendor": "Apache", "product": "tomcat" },
                        { "vendor": "n/a", "product": "*" },
                        { "vendor": "n/a", "product": "" }
                    ],
                    "descriptions": [ { "lang": "en", "value": "A flaw." } ],
                    "problemTypes": [
                        { "descriptions": [
                            { "lang": "en", "description": "CWE-22", "cweId": "CWE-22", "type": "CWE" },
                            { "lang": "en", "description": "dup", "cweId": "CWE-22" },
                            { "lang": "en", "description": "CWE-434", "cweId": "CWE-434" }
                        ]}
                    ],
                    "references": [ { "url": "https://example.invalid/advisory" } ]
                },
                "adp": [
                    {
                        "providerMetadata": { "orgId": "cisa", "shortName": "CISA-ADP" },
                        "title": "CISA ADP Vulnrichment",
                        "affected": [ { "vendor": "APACHE", "product": "TOMCAT" },
                                      { "vendor": "other", "product": "connector" } ]
                    }
                ]
            }
        })
    }

    #[test]
    fn rejected_records_are_discarded() -> anyhow::Result<()> {
        let parsed = parse_value(record("CVE-2024-1000", "REJECTED"))?;
        assert!(parsed.is_none());
        Ok(())
    }

    #[test]
    fn flattens_vendor_product_pairs_lowercased_and_deduped() -> anyhow::Result<()> {
        let model = parse_value(record("CVE-2024-1000", "PUBLISHED"))?.expect("published");

        // CNA "Apache/Tomcat" + "Apache/tomcat" + ADP "APACHE/TOMCAT"
        // collapse to one pair; "connector" comes from the ADP container;
        // empty and "*" products are excluded
        assert_eq!(
            model.affected_flattened.0,
            vec![
                gcve::Product {
                    vendor: "apache".into(),
                    product: "tomcat".into()
                },
                gcve::Product {
                    vendor: "other".into(),
                    product: "connector".into()
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn extracts_unique_cwes_in_order() -> anyhow::Result<()> {
        let model = parse_value(record("CVE-2024-1000", "PUBLISHED"))?.expect("published");
        assert_eq!(model.cwes, vec!["CWE-22".to_string(), "CWE-434".to_string()]);
        Ok(())
    }

    #[test]
    fn links_cover_cna_and_adp_products_once() -> anyhow::Result<()> {
        let model = parse_value(record("CVE-2024-1000", "PUBLISHED"))?.expect("published");
        let uuid = Uuid::new_v4();
        let ids = HashMap::from([(model.gcve_id.clone(), uuid)]);

        let links = package_links(&[model], &ids);

        assert_eq!(links.len(), 2);
        assert!(links
            .iter()
            .all(|link| link.package_ecosystem == "gcve" && link.gcve_id == Some(uuid)));
        assert!(links.iter().any(|link| link.package_name == "tomcat"));
        assert!(links.iter().any(|link| link.package_name == "connector"));
        Ok(())
    }

    #[test]
    fn duplicate_records_in_batch_link_once() -> anyhow::Result<()> {
        let first = parse_value(record("CVE-2024-1000", "PUBLISHED"))?.expect("published");
        let second = parse_value(record("CVE-2024-1000", "PUBLISHED"))?.expect("published");
        let uuid = Uuid::new_v4();
        let ids = HashMap::from([("CVE-2024-1000".to_string(), uuid)]);

        let links = package_links(&[first, second], &ids);

        // identical products of a duplicated record collapse
        assert_eq!(links.len(), 2);
        Ok(())
    }
}
