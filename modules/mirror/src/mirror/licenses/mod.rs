use super::common::{require_ok, Error};
use crate::{
    report::{Report, ReportBuilder},
    store,
};
use knowledge_entity::license;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

const LICENSE_LIST_URL: &str =
    "https://raw.githubusercontent.com/spdx/license-list-data/main/json/licenses.json";

#[derive(Debug, Deserialize)]
struct LicenseList {
    #[serde(default)]
    licenses: Vec<SpdxLicense>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxLicense {
    license_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    reference: String,
    #[serde(default)]
    details_url: String,
    #[serde(default)]
    reference_number: i32,
    #[serde(default)]
    is_deprecated_license_id: bool,
    #[serde(default)]
    is_osi_approved: bool,
    #[serde(default)]
    see_also: Vec<String>,
}

impl From<SpdxLicense> for license::Model {
    fn from(spdx: SpdxLicense) -> Self {
        Self {
            id: Uuid::new_v4(),
            license_id: spdx.license_id,
            name: spdx.name,
            reference: spdx.reference,
            details_url: spdx.details_url,
            reference_number: spdx.reference_number,
            is_deprecated_license_id: spdx.is_deprecated_license_id,
            is_osi_approved: spdx.is_osi_approved,
            see_also: spdx.see_also,
        }
    }
}

impl crate::Runner {
    /// Mirror the SPDX license list.
    #[instrument(skip(self), err)]
    pub async fn run_licenses(&self) -> Result<Report, Error> {
        log::info!("updating SPDX license metadata");
        let mut report = ReportBuilder::new();

        let response = require_ok(self.client.get(LICENSE_LIST_URL).send().await?)?;
        let list: LicenseList = response.json().await?;

        let licenses: Vec<license::Model> =
            list.licenses.into_iter().map(Into::into).collect();
        report.tick_many(licenses.len());

        store::license::batch_upsert(&self.db, licenses).await?;

        Ok(report.build())
    }
}
