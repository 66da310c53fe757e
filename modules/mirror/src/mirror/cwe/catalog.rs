//! Parser for the MITRE CWE catalog XML: builds the weakness and
//! category maps, resolves category membership, and projects every
//! weakness to its flat row.

use knowledge_entity::cwe;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use uuid::Uuid;

pub fn parse(xml: &str) -> Result<Vec<cwe::Model>, roxmltree::Error> {
    let document = Document::parse(xml)?;
    let root = document.root_element();

    let mut entries: Vec<cwe::Model> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    if let Some(weaknesses) = child(root, "Weaknesses") {
        for weakness in children(weaknesses, "Weakness") {
            if let Some(entry) = parse_weakness(weakness) {
                by_id.insert(entry.cwe_id.clone(), entries.len());
                entries.push(entry);
            }
        }
    }

    // categories reference their member weaknesses, not the other way
    // around; push the membership into each referenced weakness
    if let Some(categories) = child(root, "Categories") {
        for category in children(categories, "Category") {
            let (Some(id), Some(name)) = (category.attribute("ID"), category.attribute("Name"))
            else {
                continue;
            };

            let members = child(category, "Relationships")
                .into_iter()
                .flat_map(|relationships| children(relationships, "Has_Member"));

            for member in members {
                let Some(member_id) = member.attribute("CWE_ID") else {
                    continue;
                };
                if let Some(&index) = by_id.get(member_id) {
                    entries[index].categories.0.push(cwe::Category {
                        id: id.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }
    }

    Ok(entries)
}

fn parse_weakness(weakness: Node) -> Option<cwe::Model> {
    let id = weakness.attribute("ID")?;

    let mut entry = cwe::Model {
        id: Uuid::new_v4(),
        cwe_id: id.to_string(),
        name: attr(weakness, "Name"),
        abstraction: attr(weakness, "Abstraction"),
        structure: attr(weakness, "Structure"),
        status: attr(weakness, "Status"),
        description: child_text(weakness, "Description"),
        extended_description: child(weakness, "Extended_Description")
            .map(structured_text)
            .unwrap_or_default(),
        likelihood_of_exploit: child_text(weakness, "Likelihood_Of_Exploit"),
        categories: Default::default(),
        related_weaknesses: Default::default(),
        applicable_platforms: Default::default(),
        common_consequences: Default::default(),
        modes_of_introduction: Default::default(),
        detection_methods: Default::default(),
        potential_mitigations: Default::default(),
        observed_examples: Default::default(),
        alternate_terms: Default::default(),
        taxonomy_mappings: Default::default(),
        affected_resources: Vec::new(),
        functional_areas: Vec::new(),
    };

    if let Some(related) = child(weakness, "Related_Weaknesses") {
        for node in children(related, "Related_Weakness") {
            entry.related_weaknesses.0.push(cwe::RelatedWeakness {
                nature: attr(node, "Nature"),
                cwe_id: attr(node, "CWE_ID"),
                view_id: attr(node, "View_ID"),
                ordinal: attr(node, "Ordinal"),
                chain_id: attr(node, "Chain_ID"),
            });
        }
    }

    if let Some(platforms) = child(weakness, "Applicable_Platforms") {
        for (tag, dest) in [
            ("Language", &mut entry.applicable_platforms.language),
            (
                "Operating_System",
                &mut entry.applicable_platforms.operating_system,
            ),
            ("Technology", &mut entry.applicable_platforms.technology),
            ("Architecture", &mut entry.applicable_platforms.architecture),
        ] {
            for node in children(platforms, tag) {
                dest.push(cwe::PlatformEntry {
                    class: attr(node, "Class"),
                    prevalence: attr(node, "Prevalence"),
                    name: attr(node, "Name"),
                });
            }
        }
    }

    if let Some(consequences) = child(weakness, "Common_Consequences") {
        for node in children(consequences, "Consequence") {
            entry.common_consequences.0.push(cwe::Consequence {
                scope: children(node, "Scope").map(node_text).collect(),
                impact: children(node, "Impact").map(node_text).collect(),
                likelihood: child_text(node, "Likelihood"),
                note: child(node, "Note").map(structured_text).unwrap_or_default(),
            });
        }
    }

    if let Some(modes) = child(weakness, "Modes_Of_Introduction") {
        for node in children(modes, "Introduction") {
            entry.modes_of_introduction.0.push(cwe::Introduction {
                phase: child_text(node, "Phase"),
                note: child(node, "Note").map(structured_text).unwrap_or_default(),
            });
        }
    }

    if let Some(methods) = child(weakness, "Detection_Methods") {
        for node in children(methods, "Detection_Method") {
            entry.detection_methods.0.push(cwe::DetectionMethod {
                method: child_text(node, "Method"),
                description: child(node, "Description")
                    .map(structured_text)
                    .unwrap_or_default(),
            });
        }
    }

    if let Some(mitigations) = child(weakness, "Potential_Mitigations") {
        for node in children(mitigations, "Mitigation") {
            entry.potential_mitigations.0.push(cwe::Mitigation {
                phases: children(node, "Phase").map(node_text).collect(),
                description: child(node, "Description")
                    .map(structured_text)
                    .unwrap_or_default(),
            });
        }
    }

    if let Some(examples) = child(weakness, "Observed_Examples") {
        for node in children(examples, "Observed_Example") {
            entry.observed_examples.0.push(cwe::ObservedExample {
                reference: child_text(node, "Reference"),
                description: child_text(node, "Description"),
                link: child_text(node, "Link"),
            });
        }
    }

    if let Some(terms) = child(weakness, "Alternate_Terms") {
        for node in children(terms, "Alternate_Term") {
            entry.alternate_terms.0.push(cwe::AlternateTerm {
                term: child_text(node, "Term"),
                description: child(node, "Description")
                    .map(structured_text)
                    .unwrap_or_default(),
            });
        }
    }

    if let Some(mappings) = child(weakness, "Taxonomy_Mappings") {
        for node in children(mappings, "Taxonomy_Mapping") {
            entry.taxonomy_mappings.0.push(cwe::TaxonomyMapping {
                taxonomy_name: attr(node, "Taxonomy_Name"),
                entry_id: child_text(node, "Entry_ID"),
                entry_name: child_text(node, "Entry_Name"),
                mapping_fit: child_text(node, "Mapping_Fit"),
            });
        }
    }

    if let Some(resources) = child(weakness, "Affected_Resources") {
        entry.affected_resources = children(resources, "Affected_Resource")
            .map(node_text)
            .collect();
    }

    if let Some(areas) = child(weakness, "Functional_Areas") {
        entry.functional_areas = children(areas, "Functional_Area")
            .map(node_text)
            .collect();
    }

    Some(entry)
}

fn child<'a>(node: Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|child| child.is_element() && child.has_tag_name(name))
}

fn children<'a>(
    node: Node<'a, 'a>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'a>> + 'a {
    node.children()
        .filter(move |child| child.is_element() && child.has_tag_name(name))
}

fn attr(node: Node, name: &str) -> String {
    node.attribute(name).unwrap_or_default().to_string()
}

fn node_text(node: Node) -> String {
    clean(node.text().unwrap_or_default())
}

fn child_text(node: Node, name: &str) -> String {
    child(node, name).map(node_text).unwrap_or_default()
}

/// Collapse runs of whitespace to a single space, strip quotes, trim.
fn clean(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_was_space = false;

    for ch in text.chars() {
        if ch == '"' {
            continue;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                result.push(' ');
            }
            last_was_space = true;
        } else {
            result.push(ch);
            last_was_space = false;
        }
    }

    result.trim().to_string()
}

/// Flatten a description node holding mixed inline text, `<p>`
/// paragraphs and `<ul><li>` lists: inline text first, then the
/// paragraphs, then list items rendered as `" - item"` fragments.
fn structured_text(node: Node) -> String {
    let mut result = String::new();

    let inline: String = node
        .children()
        .filter(|child| child.is_text())
        .map(|child| child.text().unwrap_or_default())
        .collect();
    result.push_str(&clean(&inline));

    let paragraphs: Vec<String> = children(node, "p")
        .map(|p| p.text().unwrap_or_default().to_string())
        .collect();
    if !paragraphs.is_empty() {
        result.push_str(&clean(&paragraphs.join(" ")));
    }

    for list in children(node, "ul") {
        for item in children(list, "li") {
            let text: String = item
                .children()
                .filter(|child| child.is_text())
                .map(|child| child.text().unwrap_or_default())
                .collect();
            result.push_str(&format!(" - {}", clean(&text)));
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;

    const CATALOG: &str = r#"<?xml version="1.0"?>
<Weakness_Catalog xmlns="http://cwe.mitre.org/cwe-7" xmlns:xhtml="http://www.w3.org/1999/xhtml">
  <Weaknesses>
    <Weakness ID="79" Name="Improper Neutralization of Input" Abstraction="Base" Structure="Simple" Status="Stable">
      <Description>The product does not neutralize user input.</Description>
      <Extended_Description>
        Cross-site  scripting
        <xhtml:p>occurs when untrusted data reaches a page.</xhtml:p>
        <xhtml:ul><xhtml:li>reflected</xhtml:li><xhtml:li>stored</xhtml:li></xhtml:ul>
      </Extended_Description>
      <Related_Weaknesses>
        <Related_Weakness Nature="ChildOf" CWE_ID="74" View_ID="1000" Ordinal="Primary"/>
      </Related_Weaknesses>
      <Applicable_Platforms>
        <Language Class="Not Language-Specific" Prevalence="Undetermined"/>
        <Technology Class="Web Based" Prevalence="Often"/>
      </Applicable_Platforms>
      <Common_Consequences>
        <Consequence>
          <Scope>Confidentiality</Scope>
          <Scope>Integrity</Scope>
          <Impact>Read Application Data</Impact>
          <Note>A "classic" impact.</Note>
        </Consequence>
      </Common_Consequences>
      <Observed_Examples>
        <Observed_Example>
          <Reference>CVE-2021-25926</Reference>
          <Description>XSS in admin UI</Description>
          <Link>https://example.invalid/CVE-2021-25926</Link>
        </Observed_Example>
      </Observed_Examples>
      <Taxonomy_Mappings>
        <Taxonomy_Mapping Taxonomy_Name="OWASP Top Ten 2021">
          <Entry_ID>A03</Entry_ID>
          <Entry_Name>Injection</Entry_Name>
          <Mapping_Fit>CWE More Specific</Mapping_Fit>
        </Taxonomy_Mapping>
      </Taxonomy_Mappings>
    </Weakness>
    <Weakness ID="89" Name="SQL Injection" Abstraction="Base" Structure="Simple" Status="Stable">
      <Description>SQL injection.</Description>
    </Weakness>
  </Weaknesses>
  <Categories>
    <Category ID="137" Name="Data Neutralization Issues" Status="Draft">
      <Relationships>
        <Has_Member CWE_ID="79" View_ID="699"/>
        <Has_Member CWE_ID="89" View_ID="699"/>
      </Relationships>
    </Category>
    <Category ID="990" Name="Unreferenced" Status="Draft">
      <Relationships>
        <Has_Member CWE_ID="9999" View_ID="699"/>
      </Relationships>
    </Category>
  </Categories>
</Weakness_Catalog>"#;

    #[test]
    fn parses_weaknesses_and_memberships() -> anyhow::Result<()> {
        let entries = parse(CATALOG)?;
        assert_eq!(entries.len(), 2);

        let xss = entries.iter().find(|e| e.cwe_id == "79").expect("CWE-79");
        assert_eq!(xss.name, "Improper Neutralization of Input");
        assert_eq!(xss.abstraction, "Base");
        assert_eq!(xss.description, "The product does not neutralize user input.");
        assert_eq!(xss.categories.0.len(), 1);
        assert_eq!(xss.categories.0[0].id, "137");
        assert_eq!(xss.categories.0[0].name, "Data Neutralization Issues");
        assert_eq!(xss.related_weaknesses.0[0].cwe_id, "74");
        assert_eq!(xss.applicable_platforms.language.len(), 1);
        assert_eq!(xss.applicable_platforms.technology.len(), 1);
        assert_eq!(xss.observed_examples.0[0].reference, "CVE-2021-25926");
        assert_eq!(xss.taxonomy_mappings.0[0].entry_id, "A03");

        let sqli = entries.iter().find(|e| e.cwe_id == "89").expect("CWE-89");
        assert_eq!(sqli.categories.0.len(), 1);
        Ok(())
    }

    #[test]
    fn assembles_mixed_extended_description() -> anyhow::Result<()> {
        let entries = parse(CATALOG)?;
        let xss = entries.iter().find(|e| e.cwe_id == "79").expect("CWE-79");

        assert_eq!(
            xss.extended_description,
            "Cross-site scriptingoccurs when untrusted data reaches a page. - reflected - stored"
        );
        Ok(())
    }

    #[test]
    fn cleans_whitespace_and_quotes() {
        assert_eq!(clean("  a\n\tb   c  "), "a b c");
        assert_eq!(clean("say \"hi\""), "say hi");
        let entries = parse(CATALOG).expect("parse");
        let xss = entries.iter().find(|e| e.cwe_id == "79").expect("CWE-79");
        assert_eq!(xss.common_consequences.0[0].note, "A classic impact.");
        assert_eq!(
            xss.common_consequences.0[0].scope,
            vec!["Confidentiality".to_string(), "Integrity".to_string()]
        );
    }
}
