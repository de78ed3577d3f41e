//! Import entry points for the SQLite store.
//!
//! `import_records` runs a single invocation under the connection lock.
//! `import_stream` splits an NDJSON body into chunks and runs one invocation
//! per chunk, folding the results. Atomicity never spans chunks: a failed
//! chunk stops the stream, and chunks already committed stay committed.

use super::{Database, SqliteMutator};
use crate::error::ImportError;
use crate::import::stream::{ChunkReader, InputFormat, StreamLimits, read_document};
use crate::import::{ImportPolicy, ImportResult, Importer};
use crate::types::ImportRecord;
use anyhow::{Context, Result};
use std::io::BufRead;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

impl Database {
    /// Import one batch of records as a single invocation.
    pub fn import_records(
        &self,
        records: Vec<ImportRecord>,
        policy: &ImportPolicy,
        cancel: &CancellationToken,
    ) -> std::result::Result<ImportResult, ImportError> {
        self.with_conn(|conn| {
            let store = SqliteMutator::new(conn);
            let result = Importer::new(&store)
                .with_cancellation(cancel.clone())
                .run(records, policy)?;
            Ok(result)
        })
        .map_err(ImportError::from)
    }

    /// Import a streamed body, one invocation per chunk.
    ///
    /// A JSON array document is treated as a single chunk.
    pub fn import_stream<R: BufRead>(
        &self,
        mut reader: R,
        format: InputFormat,
        policy: &ImportPolicy,
        limits: StreamLimits,
        cancel: &CancellationToken,
    ) -> Result<ImportResult> {
        let mut total = ImportResult::default();

        match format.detect(&mut reader)? {
            InputFormat::Json => {
                let records = read_document(reader)?;
                total.absorb(self.import_records(records, policy, cancel)?);
            }
            InputFormat::Ndjson | InputFormat::Auto => {
                let mut chunks = ChunkReader::new(reader, limits);
                let mut chunk_no = 0usize;
                while let Some(chunk) = chunks.next() {
                    let chunk = chunk?;
                    let size = chunk.len();
                    match self.import_records(chunk, policy, cancel) {
                        Ok(result) => {
                            info!(
                                chunk = chunk_no,
                                records = size,
                                lines_read = chunks.lines_read(),
                                "Import chunk applied"
                            );
                            total.absorb(result);
                        }
                        Err(err) => {
                            warn!(
                                chunk = chunk_no,
                                lines_read = chunks.lines_read(),
                                committed_chunks = total.applied_chunks,
                                error = %err,
                                "Import chunk failed, stopping stream"
                            );
                            return Err(err).with_context(|| format!("import chunk {}", chunk_no));
                        }
                    }
                    chunk_no += 1;
                }
            }
        }

        Ok(total)
    }
}
