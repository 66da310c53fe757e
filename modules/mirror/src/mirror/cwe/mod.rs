mod catalog;

use super::common::{require_ok, Error};
use crate::{
    report::{Report, ReportBuilder},
    store,
};
use std::io::{Cursor, Read};
use tracing::instrument;
use zip::ZipArchive;

const CWE_CATALOG_URL: &str = "https://cwe.mitre.org/data/xml/cwec_latest.xml.zip";

impl crate::Runner {
    /// Mirror the MITRE CWE catalog.
    #[instrument(skip(self), err)]
    pub async fn run_cwe(&self) -> Result<Report, Error> {
        log::info!("updating CWE catalog");
        let mut report = ReportBuilder::new();

        let body = require_ok(self.client.get(CWE_CATALOG_URL).send().await?)?
            .bytes()
            .await?;

        // the archive holds a single XML file
        let mut archive = ZipArchive::new(Cursor::new(body))?;
        let mut xml = String::new();
        archive.by_index(0)?.read_to_string(&mut xml)?;

        let entries = catalog::parse(&xml)?;
        report.tick_many(entries.len());

        store::cwe::batch_upsert(&self.db, entries).await?;

        Ok(report.build())
    }
}
