use crate::adapter::QueryExecutor;
use crate::error::ResolveError;
use crate::format::ResultFormatter;
use crate::pipeline::Pipeline;
use datatalk_audit::{AuditRecord, AuditRecordBuilder, AuditRecorder};
use datatalk_core::{ErrorKind, ResolveRequest, ResolveResponse};
use datatalk_intents::Vocabulary;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// Runs one request through generation, validation, execution and
/// formatting, and writes exactly one audit record whatever the outcome.
pub struct Orchestrator {
    pipeline: Pipeline,
    executor: Arc<dyn QueryExecutor>,
    formatter: ResultFormatter,
    audit: AuditRecorder,
    vocabulary: Vocabulary,
}

impl Orchestrator {
    pub fn new(
        pipeline: Pipeline,
        executor: Arc<dyn QueryExecutor>,
        formatter: ResultFormatter,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            pipeline,
            executor,
            formatter,
            audit,
            vocabulary: Vocabulary::new(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    /// Resolve a request end-to-end.
    ///
    /// The audit record is written even if this future is dropped midway,
    /// e.g. when the HTTP client disconnects or a caller-side timeout fires.
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<ResolveResponse, ResolveError> {
        let user = request.user.id();
        let (intent, params) = self.intent_and_params(request);

        let mut pending = PendingAudit::new(self.audit.clone(), user, &intent, &request.utterance);
        let result = self.run_stages(&intent, &params, &mut pending.sql).await;

        let record = match &result {
            Ok(response) => pending.builder().succeeded(response.stats.row_count),
            Err(e) => pending.builder().failure(e.kind()),
        }
        .build();
        pending.writing = Some(record.clone());
        self.audit.record(record).await;
        pending.done = true;

        match &result {
            Ok(response) => tracing::info!(
                user,
                intent = %intent,
                rows = response.stats.row_count,
                duration_ms = response.stats.duration_ms,
                "request resolved"
            ),
            Err(ResolveError::Execution(e)) => tracing::error!(
                target: "datatalk::alert",
                user,
                intent = %intent,
                kind = %e.kind(),
                error = %e,
                "query execution failed"
            ),
            Err(e) => tracing::info!(
                user,
                intent = %intent,
                kind = %e.kind(),
                reason = %e,
                "request rejected"
            ),
        }

        result
    }

    /// The requested intent, or the vocabulary's pick when none was given.
    /// Explicit parameters win over extracted ones.
    fn intent_and_params(&self, request: &ResolveRequest) -> (String, Map<String, Value>) {
        if !request.intent.trim().is_empty() {
            return (request.intent.trim().to_string(), request.params.clone());
        }

        let classification = self.vocabulary.classify(&request.utterance);
        tracing::debug!(
            intent = ?classification.intent,
            score = classification.score,
            "classified utterance"
        );
        let mut params = classification.params;
        params.extend(request.params.clone());
        let intent = classification
            .intent
            .map(|k| k.to_string())
            .unwrap_or_default();
        (intent, params)
    }

    async fn run_stages(
        &self,
        intent: &str,
        params: &Map<String, Value>,
        sql: &mut Option<String>,
    ) -> Result<ResolveResponse, ResolveError> {
        let query = self.pipeline.generator().generate(intent, params)?;
        *sql = Some(query.sql.clone());

        let approved = self.pipeline.validator().approve(query)?;
        let result = self.executor.execute(&approved).await?;

        let query = approved.into_inner();
        let entry = self
            .pipeline
            .generator()
            .registry()
            .lookup(query.source_intent.as_str())
            .ok();
        let formatted = self
            .formatter
            .format(entry.map(|e| &e.descriptor), &result, query.row_cap);

        Ok(ResolveResponse {
            columns: formatted.columns,
            rows: formatted.rows,
            summary: formatted.summary,
            sql: query.sql,
            stats: result.stats,
        })
    }
}

/// The audit record of one in-flight request.
///
/// Dropped before `done` is set, it writes the record itself on a spawned
/// task: the record being written, or a `Failed` record for a request cut
/// off before it finished. Generation and validation never yield, so an
/// interrupted request had already been approved and was executing.
struct PendingAudit {
    audit: AuditRecorder,
    user: String,
    intent: String,
    utterance: String,
    started: Instant,
    sql: Option<String>,
    writing: Option<AuditRecord>,
    done: bool,
}

impl PendingAudit {
    fn new(audit: AuditRecorder, user: &str, intent: &str, utterance: &str) -> Self {
        Self {
            audit,
            user: user.to_string(),
            intent: intent.to_string(),
            utterance: utterance.to_string(),
            started: Instant::now(),
            sql: None,
            writing: None,
            done: false,
        }
    }

    fn builder(&self) -> AuditRecordBuilder {
        let mut record = AuditRecord::builder(self.user.as_str(), self.intent.as_str())
            .utterance(&self.utterance, self.audit.utterance_policy())
            .duration_ms(self.started.elapsed().as_millis() as u64);
        if let Some(sql) = &self.sql {
            record = record.sql(sql.as_str());
        }
        record
    }
}

impl Drop for PendingAudit {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let record = match self.writing.take() {
            Some(record) => record,
            None => {
                tracing::warn!(
                    user = %self.user,
                    intent = %self.intent,
                    "request dropped before completion"
                );
                self.builder().failure(ErrorKind::ExecutionError).build()
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let audit = self.audit.clone();
                handle.spawn(async move { audit.record(record).await });
            }
            Err(_) => tracing::error!(
                target: "datatalk::audit",
                kind = %ErrorKind::AuditWriteFailure,
                record = %record.to_log_line(),
                "no runtime left to write the audit record of a dropped request"
            ),
        }
    }
}
