//! Wire model for the NVD REST 2.0 API and the normalisation that
//! flattens configurations down to application-class CPE matches.

use knowledge_entity::nvd;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvdResponse {
    #[serde(default)]
    pub total_results: usize,
    #[serde(default)]
    pub vulnerabilities: Vec<VulnerabilityWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct VulnerabilityWrapper {
    pub cve: CveItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveItem {
    pub id: String,
    #[serde(default)]
    pub source_identifier: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub vuln_status: String,
    #[serde(default)]
    pub descriptions: Vec<nvd::Description>,
    #[serde(default)]
    pub metrics: serde_json::Value,
    #[serde(default)]
    pub weaknesses: serde_json::Value,
    #[serde(default)]
    pub configurations: Vec<Configuration>,
    #[serde(default)]
    pub references: Vec<nvd::Reference>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub nodes: Vec<ConfigNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigNode {
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub cpe_match: Vec<nvd::CpeMatch>,
    #[serde(default)]
    pub children: Vec<ConfigNode>,
}

/// Project a page of API results onto rows. Configurations are consumed
/// here and not stored.
pub fn normalize(response: NvdResponse) -> Vec<nvd::Model> {
    response
        .vulnerabilities
        .into_iter()
        .map(|wrapper| {
            let cve = wrapper.cve;
            let affected = create_affected(&cve.configurations);

            // only the first constellation feeds the flattened index
            let mut flattened = Vec::new();
            if let Some(first) = affected.first() {
                flattened.extend(first.sources.iter().cloned());
                flattened.extend(first.running_on.iter().cloned());
                flattened.extend(first.running_on_applications_only.iter().cloned());
            }

            nvd::Model {
                id: Uuid::new_v4(),
                nvd_id: cve.id,
                source_identifier: cve.source_identifier,
                published: cve.published,
                last_modified: cve.last_modified,
                vuln_status: cve.vuln_status,
                descriptions: nvd::Descriptions(cve.descriptions),
                metrics: cve.metrics,
                weaknesses: cve.weaknesses,
                affected: nvd::AffectedList(affected),
                affected_flattened: nvd::CpeMatches(flattened),
                references: nvd::References(cve.references),
            }
        })
        .collect()
}

/// Build the affected constellations from the first configuration.
///
/// An `AND` node with two children describes a vulnerable artifact
/// (first child) and what it runs on (second child); an `OR` node, or an
/// `AND` node without children, is a plain list of vulnerable artifacts.
/// Constellations whose sources contain no application-class CPE are
/// dropped entirely; OS and hardware vulnerabilities are not our
/// business.
fn create_affected(configurations: &[Configuration]) -> Vec<nvd::Affected> {
    let mut affected = Vec::new();

    let Some(configuration) = configurations.first() else {
        return affected;
    };

    for node in &configuration.nodes {
        match node.operator.as_str() {
            "AND" => {
                if node.children.len() < 2 {
                    if !node.cpe_match.is_empty() {
                        let sources = with_criteria(node.cpe_match.clone());
                        if has_application(&sources) {
                            affected.push(nvd::Affected {
                                sources: applications_only(&sources),
                                running_on: Vec::new(),
                                running_on_applications_only: Vec::new(),
                            });
                        }
                    }
                } else {
                    let sources = with_criteria(node.children[0].cpe_match.clone());
                    let running_on = with_criteria(node.children[1].cpe_match.clone());

                    if has_application(&sources) {
                        affected.push(nvd::Affected {
                            sources: applications_only(&sources),
                            running_on_applications_only: applications_only(&running_on),
                            running_on,
                        });
                    }
                }
            }
            "OR" => {
                let sources = with_criteria(node.cpe_match.clone());
                if has_application(&sources) {
                    affected.push(nvd::Affected {
                        sources: applications_only(&sources),
                        running_on: Vec::new(),
                        running_on_applications_only: Vec::new(),
                    });
                }
            }
            _ => {}
        }
    }

    affected
}

fn with_criteria(mut matches: Vec<nvd::CpeMatch>) -> Vec<nvd::CpeMatch> {
    for cpe in &mut matches {
        if let Some(dict) = parse_criteria(&cpe.criteria) {
            cpe.criteria_dict = dict;
        }
    }
    matches
}

/// Split a `cpe:2.3:part:vendor:product:...` criteria string into its
/// named components. Malformed strings yield `None` and keep the empty
/// dictionary.
fn parse_criteria(criteria: &str) -> Option<nvd::CriteriaDict> {
    let parts: Vec<&str> = criteria.split(':').collect();
    if parts.len() < 13 {
        return None;
    }

    Some(nvd::CriteriaDict {
        part: parts[2].to_string(),
        vendor: parts[3].to_string(),
        product: parts[4].to_string(),
        version: parts[5].to_string(),
        update: parts[6].to_string(),
        edition: parts[7].to_string(),
        language: parts[8].to_string(),
        sw_edition: parts[9].to_string(),
        target_sw: parts[10].to_string(),
        target_hw: parts[11].to_string(),
        other: parts[12].to_string(),
    })
}

fn has_application(matches: &[nvd::CpeMatch]) -> bool {
    matches.iter().any(|cpe| cpe.criteria_dict.part == "a")
}

fn applications_only(matches: &[nvd::CpeMatch]) -> Vec<nvd::CpeMatch> {
    matches
        .iter()
        .filter(|cpe| cpe.criteria_dict.part == "a")
        .cloned()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn page(configurations: serde_json::Value) -> NvdResponse {
        serde_json::from_value(json!({
            "totalResults": 1,
            "vulnerabilities": [
                {
                    "cve": {
                        "id": "CVE-2024-0001",
                        "sourceIdentifier": "cve@mitre.org",
                        "published": "2024-01-01T00:00:00.000",
                        "lastModified": "2024-02-01T00:00:00.000",
                        "vulnStatus": "Analyzed",
                        "descriptions": [ { "lang": "en", "value": "A bug." } ],
                        "configurations": configurations,
                        "references": [ { "url": "https://example.invalid/ref" } ]
                    }
                }
            ]
        }))
        .expect("valid page")
    }

    #[test]
    fn splits_criteria_strings() {
        let dict =
            parse_criteria("cpe:2.3:a:django:django:1.0:*:*:*:*:python:*:*").expect("valid cpe");
        assert_eq!(dict.part, "a");
        assert_eq!(dict.vendor, "django");
        assert_eq!(dict.product, "django");
        assert_eq!(dict.version, "1.0");
        assert_eq!(dict.target_sw, "python");

        assert!(parse_criteria("not-a-cpe").is_none());
    }

    #[test]
    fn and_nodes_split_sources_and_platform() {
        let models = normalize(page(json!([{
            "nodes": [{
                "operator": "AND",
                "children": [
                    { "cpeMatch": [
                        { "vulnerable": true, "criteria": "cpe:2.3:a:twbs:bootstrap:3.0:*:*:*:*:*:*:*" }
                    ]},
                    { "cpeMatch": [
                        { "vulnerable": false, "criteria": "cpe:2.3:a:djangoproject:django:4.0:*:*:*:*:*:*:*" },
                        { "vulnerable": false, "criteria": "cpe:2.3:o:microsoft:windows:10:*:*:*:*:*:*:*" }
                    ]}
                ]
            }]
        }])));

        let affected = &models[0].affected.0;
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].sources.len(), 1);
        assert_eq!(affected[0].running_on.len(), 2);
        assert_eq!(affected[0].running_on_applications_only.len(), 1);
        assert_eq!(
            affected[0].running_on_applications_only[0].criteria_dict.product,
            "django"
        );
    }

    #[test]
    fn flattened_index_has_no_os_or_hardware_sources() {
        let models = normalize(page(json!([{
            "nodes": [{
                "operator": "OR",
                "cpeMatch": [
                    { "vulnerable": true, "criteria": "cpe:2.3:a:openssl:openssl:1.0:*:*:*:*:*:*:*" },
                    { "vulnerable": true, "criteria": "cpe:2.3:o:linux:linux_kernel:5.0:*:*:*:*:*:*:*" },
                    { "vulnerable": true, "criteria": "cpe:2.3:h:intel:cpu:-:*:*:*:*:*:*:*" }
                ]
            }]
        }])));

        let flattened = &models[0].affected_flattened.0;
        assert_eq!(flattened.len(), 1);
        assert!(flattened
            .iter()
            .all(|cpe| !matches!(cpe.criteria_dict.part.as_str(), "o" | "h")));
    }

    #[test]
    fn os_only_constellations_are_dropped() {
        let models = normalize(page(json!([{
            "nodes": [{
                "operator": "OR",
                "cpeMatch": [
                    { "vulnerable": true, "criteria": "cpe:2.3:o:linux:linux_kernel:5.0:*:*:*:*:*:*:*" }
                ]
            }]
        }])));

        assert!(models[0].affected.0.is_empty());
        assert!(models[0].affected_flattened.0.is_empty());
    }
}
