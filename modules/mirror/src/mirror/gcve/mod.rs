pub mod model;

use super::common::{require_ok, Error};
use crate::{
    report::{Phase, Report, ReportBuilder},
    store,
};
use futures::StreamExt;
use knowledge_entity::gcve;
use time::{Duration, OffsetDateTime};
use tracing::instrument;

const BULK_DUMP_URL: &str = "https://vulnerability.circl.lu/dumps/cvelistv5.ndjson";
const VULNRICHMENT_URL: &str = "https://vulnerability.circl.lu/dumps/vulnrichment.ndjson";
const LAST_UPDATED_API: &str = "https://vulnerability.circl.lu/api/last";

const BATCH_SIZE: usize = 100;
/// NDJSON lines can get large; anything beyond this is dropped as
/// malformed instead of buffering without bound.
const MAX_LINE: usize = 10 * 1024 * 1024;
/// A cursor older than this triggers a full re-import instead of an
/// incremental catch-up.
const FULL_REIMPORT_AFTER: Duration = Duration::days(30);

impl crate::Runner {
    /// Mirror CVE records from vulnerability-lookup: NDJSON bulk dumps
    /// for the initial load, the incremental API afterwards.
    #[instrument(skip(self), err)]
    pub async fn run_gcve(&self) -> Result<Report, Error> {
        log::info!("updating GCVE / vulnerability-lookup");
        let mut report = ReportBuilder::new();

        let cursor = store::cursor::read(&self.db, "gcve")
            .await
            .map_err(Error::Cursor)?;
        let now = OffsetDateTime::now_utc();

        match cursor {
            None => {
                log::info!("no previous GCVE sync, performing full bulk import");
                self.bulk_import(&mut report).await?;
                self.import_vulnrichment(&mut report).await;
            }
            Some(cursor) if now - cursor > FULL_REIMPORT_AFTER => {
                log::info!("GCVE cursor older than 30 days, performing full re-import");
                self.bulk_import(&mut report).await?;
                self.import_vulnrichment(&mut report).await;
            }
            Some(cursor) => {
                if let Err(err) = self.incremental_update(cursor, &mut report).await {
                    log::warn!("GCVE incremental update failed, falling back to bulk: {err}");
                    self.bulk_import(&mut report).await?;
                }
            }
        }

        store::cursor::write(&self.db, "gcve", now)
            .await
            .map_err(Error::Cursor)?;

        Ok(report.build())
    }

    async fn bulk_import(&self, report: &mut ReportBuilder) -> Result<(), Error> {
        log::info!("downloading cvelistv5 bulk dump");
        let response = require_ok(self.client.get(BULK_DUMP_URL).send().await?)?;
        self.process_ndjson(response, report).await
    }

    /// Merge the CISA ADP enrichment dump. Best-effort: a failure here is
    /// recorded but never fails the mirror.
    async fn import_vulnrichment(&self, report: &mut ReportBuilder) {
        log::info!("downloading vulnrichment dump");

        let result = match self.client.get(VULNRICHMENT_URL).send().await {
            Ok(response) => match require_ok(response) {
                Ok(response) => self.process_ndjson(response, report).await,
                Err(err) => Err(err),
            },
            Err(err) => Err(err.into()),
        };

        if let Err(err) = result {
            log::warn!("vulnrichment import failed: {err}");
            report.add_error(Phase::Retrieval, VULNRICHMENT_URL, err.to_string());
        }
    }

    /// Stream an NDJSON dump line by line, upserting in batches.
    async fn process_ndjson(
        &self,
        response: reqwest::Response,
        report: &mut ReportBuilder,
    ) -> Result<(), Error> {
        let mut stream = response.bytes_stream();

        let mut lines = LineBuffer::new(MAX_LINE);
        let mut batch: Vec<gcve::Model> = Vec::with_capacity(BATCH_SIZE);
        let mut total = 0usize;

        while let Some(chunk) = stream.next().await {
            lines.push(&chunk?);

            while let Some(line) = lines.next_line() {
                match line {
                    Ok(line) => {
                        self.handle_line(&line, &mut batch, &mut total, report).await
                    }
                    Err(Oversized) => report.add_error(
                        Phase::Validation,
                        "ndjson",
                        "line exceeds 10 MiB, dropped",
                    ),
                }
            }
        }

        if let Some(line) = lines.finish() {
            self.handle_line(&line, &mut batch, &mut total, report).await;
        }

        if !batch.is_empty() {
            total += batch.len();
            self.process_batch(std::mem::take(&mut batch), report).await;
        }

        log::info!("GCVE: {total} records processed");
        Ok(())
    }

    async fn handle_line(
        &self,
        line: &[u8],
        batch: &mut Vec<gcve::Model>,
        total: &mut usize,
        report: &mut ReportBuilder,
    ) {
        if line.is_empty() {
            return;
        }

        match model::parse_record(line) {
            Ok(Some(item)) => {
                batch.push(item);
                report.tick();
            }
            // REJECTED, or a line that is not a CVE record
            Ok(None) | Err(_) => return,
        }

        if batch.len() >= BATCH_SIZE {
            *total += batch.len();
            self.process_batch(std::mem::take(batch), report).await;

            if *total % 10_000 == 0 {
                log::info!("GCVE: processed {total} records");
            }
        }
    }

    /// Upsert a batch, resolve its UUIDs, and write the junction rows.
    /// A failing batch is recorded and the stream continues.
    async fn process_batch(&self, batch: Vec<gcve::Model>, report: &mut ReportBuilder) {
        let first = batch
            .first()
            .map(|item| item.gcve_id.clone())
            .unwrap_or_default();

        if let Err(err) = self.store_batch(batch).await {
            log::warn!("error processing GCVE batch starting at {first}: {err}");
            report.add_error(Phase::Storage, first, err.to_string());
        }
    }

    async fn store_batch(&self, batch: Vec<gcve::Model>) -> Result<(), Error> {
        store::gcve::batch_upsert(&self.db, batch.clone()).await?;

        let gcve_ids: Vec<String> = batch.iter().map(|item| item.gcve_id.clone()).collect();
        let ids = store::gcve::lookup_ids(&self.db, &gcve_ids).await?;

        let links = model::package_links(&batch, &ids);
        store::package_vulnerability::insert_links(&self.db, links).await?;

        Ok(())
    }

    /// Catch up via the incremental API; the response is a JSON array of
    /// full CVE records.
    async fn incremental_update(
        &self,
        since: OffsetDateTime,
        report: &mut ReportBuilder,
    ) -> Result<(), Error> {
        log::info!("GCVE incremental update since {since}");

        let mut request = self.client.get(LAST_UPDATED_API);
        if let Some(key) = self.sources.vulnerability_lookup_key() {
            request = request.header("X-API-KEY", key);
        }

        let response = require_ok(request.send().await?)?;
        let records: Vec<serde_json::Value> = response.json().await?;

        let mut batch: Vec<gcve::Model> = Vec::with_capacity(BATCH_SIZE);
        let mut total = 0usize;

        for record in records {
            match model::parse_value(record) {
                Ok(Some(item)) => {
                    batch.push(item);
                    report.tick();
                }
                Ok(None) | Err(_) => continue,
            }

            if batch.len() >= BATCH_SIZE {
                total += batch.len();
                self.process_batch(std::mem::take(&mut batch), report).await;
            }
        }

        if !batch.is_empty() {
            total += batch.len();
            self.process_batch(batch, report).await;
        }

        log::info!("GCVE incremental update: {total} records processed");
        Ok(())
    }
}

/// Marker for a line that blew through the length cap.
struct Oversized;

/// Splits a chunked byte stream into newline-delimited records, with a
/// length cap per line.
///
/// An overlong line is surfaced exactly once as [`Oversized`]; its
/// remaining bytes, up to and including the closing newline, are
/// discarded without being buffered.
struct LineBuffer {
    buffer: Vec<u8>,
    max_line: usize,
    skipping: bool,
}

impl LineBuffer {
    fn new(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            skipping: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<Result<Vec<u8>, Oversized>> {
        loop {
            match self.buffer.iter().position(|byte| *byte == b'\n') {
                Some(newline) => {
                    let rest = self.buffer.split_off(newline + 1);
                    let mut line = std::mem::replace(&mut self.buffer, rest);
                    line.truncate(newline);

                    if self.skipping {
                        // tail of a line we already gave up on
                        self.skipping = false;
                        continue;
                    }

                    return Some(Ok(line));
                }
                None => {
                    if !self.skipping && self.buffer.len() > self.max_line {
                        self.buffer.clear();
                        self.skipping = true;
                        return Some(Err(Oversized));
                    }
                    return None;
                }
            }
        }
    }

    /// The trailing record of a dump that does not end in a newline.
    fn finish(mut self) -> Option<Vec<u8>> {
        (!self.skipping && !self.buffer.is_empty()).then(|| std::mem::take(&mut self.buffer))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn drain(lines: &mut LineBuffer) -> Vec<Result<Vec<u8>, Oversized>> {
        let mut out = Vec::new();
        while let Some(line) = lines.next_line() {
            out.push(line);
        }
        out
    }

    #[test]
    fn splits_lines_across_chunk_boundaries() {
        let mut lines = LineBuffer::new(1024);

        lines.push(b"{\"a\":1}\n{\"b\"");
        let first = drain(&mut lines);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].as_ref().ok(), Some(&b"{\"a\":1}".to_vec()));

        lines.push(b":2}\n");
        let second = drain(&mut lines);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].as_ref().ok(), Some(&b"{\"b\":2}".to_vec()));

        lines.push(b"{\"c\":3}");
        assert!(drain(&mut lines).is_empty());
        assert_eq!(lines.finish(), Some(b"{\"c\":3}".to_vec()));
    }

    #[test]
    fn oversized_lines_are_dropped_once_and_resynced() {
        let mut lines = LineBuffer::new(8);

        lines.push(b"0123456789abcdef");
        let overflow = drain(&mut lines);
        assert_eq!(overflow.len(), 1);
        assert!(overflow[0].is_err());

        // rest of the oversized line, then a healthy one
        lines.push(b"ghij\n{\"ok\":1}\n");
        let healthy = drain(&mut lines);
        assert_eq!(healthy.len(), 1);
        assert_eq!(healthy[0].as_ref().ok(), Some(&b"{\"ok\":1}".to_vec()));
    }
}
