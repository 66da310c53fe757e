use super::common::{require_ok, Error};
use crate::{
    report::{Report, ReportBuilder},
    store,
};
use flate2::read::GzDecoder;
use knowledge_entity::epss;
use std::io::Read;
use tracing::instrument;

const EPSS_URL: &str = "https://epss.empiricalsecurity.com/epss_scores-current.csv.gz";

impl crate::Runner {
    /// Mirror the EPSS score feed.
    #[instrument(skip(self), err)]
    pub async fn run_epss(&self) -> Result<Report, Error> {
        log::info!("updating EPSS scores");
        let mut report = ReportBuilder::new();

        let body = require_ok(self.client.get(EPSS_URL).send().await?)?
            .bytes()
            .await?;

        let scores = decode_scores(&body)?;
        report.tick_many(scores.len());

        store::epss::batch_upsert(&self.db, scores).await?;

        Ok(report.build())
    }
}

/// Decode the gzipped CSV feed.
///
/// The first line is a metadata comment, the second the column header;
/// rows that fail to parse are skipped.
fn decode_scores(raw: &[u8]) -> Result<Vec<epss::Model>, Error> {
    let mut text = String::new();
    GzDecoder::new(raw).read_to_string(&mut text)?;

    let Some((_, rows)) = text.split_once('\n') else {
        return Ok(Vec::new());
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(rows.as_bytes());

    let mut scores = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else {
            continue;
        };
        if record.len() < 3 {
            continue;
        }
        let (Ok(score), Ok(percentile)) = (record[1].parse::<f32>(), record[2].parse::<f32>())
        else {
            continue;
        };

        scores.push(epss::Model {
            cve: record[0].to_string(),
            score,
            percentile,
        });
    }

    Ok(scores)
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    fn gzip(content: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).expect("write");
        encoder.finish().expect("finish")
    }

    #[test]
    fn decodes_scores_and_skips_junk() -> anyhow::Result<()> {
        let csv = "#model_version:v2025.03.14,score_date:2025-07-01\n\
                   cve,epss,percentile\n\
                   CVE-2024-0001,0.97255,0.99957\n\
                   CVE-2024-0002,not-a-number,0.5\n\
                   CVE-2024-0003,0.00042,0.05561\n\
                   short,row\n";

        let scores = decode_scores(&gzip(csv))?;

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].cve, "CVE-2024-0001");
        assert!((scores[0].score - 0.97255).abs() < 1e-6);
        assert_eq!(scores[1].cve, "CVE-2024-0003");
        Ok(())
    }

    #[test]
    fn tolerates_truncated_feed() -> anyhow::Result<()> {
        assert!(decode_scores(&gzip("#only a comment"))?.is_empty());
        Ok(())
    }
}
