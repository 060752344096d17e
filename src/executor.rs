// SPDX-License-Identifier: Apache-2.0

//! Streaming Executor
//!
//! Pull-based iteration over the output rows of one invocation. Each input
//! row is sent only when the consumer asks for more, one call at a time.
//! Input rows whose response holds no item produce no output and are skipped.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, Stream};
use tracing::{debug, info, instrument, warn};
use url::Url;

use apifed_core::{ApiTransport, FederationResult, InvocationId, Row, Variable};

use crate::binding::{OutputBinding, ResolvedInput};
use crate::extract::{PathExtractor, ResultItem};
use crate::metrics;
use crate::request::build_request;
use crate::template::ApiTemplate;

/// Everything an invocation needs that does not change between rows
#[derive(Debug, Clone)]
pub struct CallPlan {
    pub id: InvocationId,
    pub template: Arc<ApiTemplate>,
    pub inputs: Arc<[ResolvedInput]>,
    pub outputs: Arc<[OutputBinding]>,
    pub endpoint: Url,
}

impl CallPlan {
    /// Variables that emitted rows may bind, in output declaration order
    pub fn output_variables(&self) -> Vec<Variable> {
        self.outputs.iter().map(|o| o.variable.clone()).collect()
    }
}

enum CursorState {
    /// Nothing buffered; the next pull sends the row under the cursor.
    Ready,
    /// Items of the last productive call, never empty.
    Buffered {
        row: Row,
        items: VecDeque<Box<dyn ResultItem>>,
    },
    Exhausted,
    Closed,
    /// An error was surfaced; no further rows.
    Failed,
}

impl CursorState {
    fn name(&self) -> &'static str {
        match self {
            CursorState::Ready => "ready",
            CursorState::Buffered { .. } => "buffered",
            CursorState::Exhausted => "exhausted",
            CursorState::Closed => "closed",
            CursorState::Failed => "failed",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            CursorState::Exhausted | CursorState::Closed | CursorState::Failed
        )
    }
}

/// Lazy sequence of output rows for one invocation
///
/// Holds the transport handle until the sequence is exhausted, closed or
/// fails; dropping it releases everything as well.
pub struct ResultRows {
    plan: Arc<CallPlan>,
    transport: Option<Arc<dyn ApiTransport>>,
    extractor: Arc<dyn PathExtractor>,
    rows: Vec<Row>,
    cursor: usize,
    state: CursorState,
}

impl ResultRows {
    pub fn new(
        plan: Arc<CallPlan>,
        rows: Vec<Row>,
        transport: Arc<dyn ApiTransport>,
        extractor: Arc<dyn PathExtractor>,
    ) -> Self {
        Self {
            plan,
            transport: Some(transport),
            extractor,
            rows,
            cursor: 0,
            state: CursorState::Ready,
        }
    }

    pub fn invocation_id(&self) -> InvocationId {
        self.plan.id
    }

    /// Number of input rows already sent
    pub fn rows_sent(&self) -> usize {
        self.cursor
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, CursorState::Closed)
    }

    /// Returns true iff another output row is available, calling the
    /// external API as many times as needed to find one.
    pub async fn has_next(&mut self) -> FederationResult<bool> {
        self.advance().await?;
        Ok(matches!(self.state, CursorState::Buffered { .. }))
    }

    /// Returns the next output row: the source row joined with the values
    /// extracted from the next buffered item.
    pub async fn next_row(&mut self) -> FederationResult<Option<Row>> {
        self.advance().await?;

        let CursorState::Buffered { row, items } = &mut self.state else {
            return Ok(None);
        };
        let Some(item) = items.pop_front() else {
            self.state = CursorState::Ready;
            return Ok(None);
        };

        let extracted = self.plan.outputs.iter().filter_map(|output| {
            item.extract(&output.path)
                .map(|value| (output.variable.clone(), value))
        });
        let joined = row.joined(extracted);

        if items.is_empty() {
            self.state = CursorState::Ready;
        }
        Ok(Some(joined))
    }

    /// Stops the sequence and releases the transport. Idempotent.
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            self.release();
            return;
        }
        debug!(
            invocation = %self.plan.id,
            rows_sent = self.cursor,
            rows_total = self.rows.len(),
            "Closing result rows"
        );
        metrics::record_close();
        self.finish(CursorState::Closed);
    }

    /// Consumes the executor as a stream of rows.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = FederationResult<Row>> + Send {
        stream::unfold(self, |mut rows| async move {
            match rows.next_row().await {
                Ok(Some(row)) => Some((Ok(row), rows)),
                Ok(None) => None,
                Err(e) => Some((Err(e), rows)),
            }
        })
    }

    async fn advance(&mut self) -> FederationResult<()> {
        while matches!(self.state, CursorState::Ready) {
            if self.cursor >= self.rows.len() {
                self.finish(CursorState::Exhausted);
                break;
            }
            let Some(transport) = self.transport.clone() else {
                self.finish(CursorState::Exhausted);
                break;
            };

            // The cursor moves only once the call completes, so a pull
            // cancelled mid-call re-sends the same row.
            let result = self
                .dispatch(transport.as_ref(), &self.rows[self.cursor])
                .await;
            match result {
                Ok(items) if items.is_empty() => {
                    debug!(
                        invocation = %self.plan.id,
                        row = self.cursor,
                        "No items in response, skipping row"
                    );
                    self.cursor += 1;
                }
                Ok(items) => {
                    let row = std::mem::take(&mut self.rows[self.cursor]);
                    self.cursor += 1;
                    self.state = CursorState::Buffered {
                        row,
                        items: items.into(),
                    };
                }
                Err(e) => {
                    warn!(
                        invocation = %self.plan.id,
                        template = %self.plan.template.name(),
                        row = self.cursor,
                        error = %e,
                        "API call failed, ending result rows"
                    );
                    self.cursor += 1;
                    self.finish(CursorState::Failed);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(invocation = %self.plan.id, template = %self.plan.template.name(), row = self.cursor)
    )]
    async fn dispatch(
        &self,
        transport: &dyn ApiTransport,
        row: &Row,
    ) -> FederationResult<Vec<Box<dyn ResultItem>>> {
        let template = &self.plan.template;
        let request = build_request(template, &self.plan.inputs, &self.plan.endpoint, row)?;
        info!("REQUEST: {}", request.url());

        let started = Instant::now();
        let result = match transport.fetch(&request).await {
            Ok(response) => self
                .extractor
                .extract_items(&response.body, template.items_path()),
            Err(e) => Err(e),
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let items = result.as_ref().map(Vec::len).unwrap_or(0);
        metrics::record_call(elapsed_ms, items, result.is_ok());
        debug!(items, elapsed_ms, transport = transport.transport_id(), "Call completed");
        result
    }

    fn finish(&mut self, state: CursorState) {
        self.state = state;
        self.release();
    }

    fn release(&mut self) {
        self.transport = None;
        self.rows = Vec::new();
    }
}

impl fmt::Debug for ResultRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultRows")
            .field("invocation", &self.plan.id)
            .field("template", &self.plan.template.name())
            .field("state", &self.state.name())
            .field("cursor", &self.cursor)
            .field("rows", &self.rows.len())
            .finish()
    }
}
