//! Orchestrator for the generate/execute/correct workflow.
//!
//! Drives one question through SQL generation, execution, and bounded
//! correction, then optionally asks for a human-readable answer. The loop
//! is an explicit state machine; each step consumes the previous state and
//! returns the next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use super::config::NqlConfig;
use super::prompt::{Prompt, PromptBuilder, PromptSet, malformed_output_message};
use super::provider::LlmProvider;
use super::result::{Answer, AttemptRecord, ChatOptions, ChatOutcome, ChatResult};
use super::sql_agent::SqlAgent;
use super::summarizer::SummarizerAgent;
use super::traits::{Agent, AgentResponse};
use crate::error::NqlError;
use crate::schema::SchemaContext;
use crate::sql::{
    CandidateQuery, DatabaseKind, ExecutionOutcome, QueryExecutor, Row, SqliteExecutor,
    extract_sql,
};

/// Longest accepted question, in bytes.
const MAX_QUESTION_LEN: usize = 10_000;

/// Orchestrates the NL-to-SQL workflow.
///
/// Holds the schema, the model gateway, and (once connected) the database
/// executor. All of it is read-only after construction, so one instance can
/// serve concurrent `chat` calls.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    config: NqlConfig,
    prompts: PromptBuilder,
    sql_agent: SqlAgent,
    summarizer: SummarizerAgent,
    executor: Option<Arc<dyn QueryExecutor>>,
}

impl Orchestrator {
    /// Creates a new orchestrator with the given provider, configuration, and schema.
    ///
    /// Loads prompt templates from [`NqlConfig::prompt_dir`], falling back to
    /// compiled-in defaults.
    pub fn new(provider: Arc<dyn LlmProvider>, config: NqlConfig, schema: SchemaContext) -> Self {
        let prompts = PromptBuilder::new(schema, PromptSet::load(config.prompt_dir.as_deref()));
        Self {
            provider,
            sql_agent: SqlAgent::new(&config),
            summarizer: SummarizerAgent::new(&config),
            config,
            prompts,
            executor: None,
        }
    }

    /// Replaces the prompt templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = PromptBuilder::new(self.prompts.schema().clone(), prompts);
        self.apply_dialect();
        self
    }

    /// Plugs in a database executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Box<dyn QueryExecutor>) -> Self {
        self.executor = Some(Arc::from(executor));
        self.apply_dialect();
        self
    }

    /// Connects to the database at `database_url`.
    ///
    /// Only SQLite URLs (or bare file paths) are executable.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] for other databases or when the
    /// SQLite file cannot be opened.
    pub fn connect(&mut self, database_url: &str) -> Result<(), NqlError> {
        let kind = DatabaseKind::from_url(database_url);
        match kind {
            DatabaseKind::Sqlite | DatabaseKind::Unknown => {
                let executor = SqliteExecutor::open(database_url, self.config.query_timeout)?;
                info!(database = %kind, "connected to database");
                self.executor = Some(Arc::new(executor));
                self.apply_dialect();
                Ok(())
            }
            DatabaseKind::Postgresql | DatabaseKind::Mysql => Err(NqlError::configuration(
                format!("no {kind} driver is available; only SQLite databases can be executed"),
            )),
        }
    }

    /// Whether a database executor is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.executor.is_some()
    }

    /// The pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &NqlConfig {
        &self.config
    }

    /// The schema every prompt is grounded on.
    #[must_use]
    pub const fn schema(&self) -> &SchemaContext {
        self.prompts.schema()
    }

    /// Chat options using the configured default correction budget.
    #[must_use]
    pub const fn default_options(&self) -> ChatOptions {
        ChatOptions::new(self.config.max_retries)
    }

    /// Generates SQL for `question` without executing it.
    ///
    /// # Errors
    ///
    /// Propagates model gateway errors, and returns
    /// [`NqlError::MalformedOutput`] when the response holds no `SELECT`.
    pub async fn generate_sql(&self, question: &str) -> Result<CandidateQuery, NqlError> {
        validate_question(question)?;
        let prompt = self.prompts.generate(question, now());
        let response = self.sql_agent.execute(self.provider.as_ref(), &prompt).await?;
        let query = extract_sql(&response.content)?;
        info!(sql = %query, tokens = response.usage.total_tokens, "generated query");
        Ok(query)
    }

    /// Runs the full generate/execute/correct loop for `question`.
    ///
    /// Retryable failures (malformed output, execution errors) drive
    /// corrections and never surface as `Err`: after `max_retries`
    /// corrections the result is [`ChatOutcome::Exhausted`].
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] when no database is connected or
    /// the question is invalid, and propagates model gateway errors
    /// immediately.
    pub async fn chat(&self, question: &str, options: ChatOptions) -> Result<ChatResult, NqlError> {
        validate_question(question)?;
        let executor = self.executor.as_ref().ok_or_else(|| {
            NqlError::configuration("no database connected; call connect() before chat()")
        })?;

        let mut run = LoopRun::new(options.max_retries);
        let mut state = LoopState::Init;

        let outcome = loop {
            state = match state {
                LoopState::Init => {
                    let prompt = self.prompts.generate(question, now());
                    self.generate(&prompt, &mut run).await?
                }
                LoopState::Correcting { failed, error } => {
                    let prompt = self.prompts.correct(
                        question,
                        failed.as_ref().map(CandidateQuery::as_str),
                        &error,
                        now(),
                    );
                    self.generate(&prompt, &mut run).await?
                }
                LoopState::Generated(query) => {
                    let outcome = execute(executor, &query).await;
                    LoopState::Executed { query, outcome }
                }
                LoopState::Malformed { content } => {
                    let error = malformed_output_message(&content);
                    warn!(attempt = run.history.len() + 1, "model output held no SELECT statement");
                    run.history.push(AttemptRecord {
                        query: None,
                        error: Some(error.clone()),
                        elapsed: Duration::ZERO,
                    });
                    run.after_failure(None, error)
                }
                LoopState::Executed { query, outcome } => {
                    run.execution_time = outcome.elapsed();
                    match outcome {
                        ExecutionOutcome::Success { rows, elapsed } => {
                            run.history.push(AttemptRecord {
                                query: Some(query),
                                error: None,
                                elapsed,
                            });
                            LoopState::Terminal(ChatOutcome::Success { rows, answer: None })
                        }
                        ExecutionOutcome::Failure { error, elapsed } => {
                            warn!(
                                attempt = run.history.len() + 1,
                                sql = %query,
                                error = %error,
                                "query execution failed"
                            );
                            run.history.push(AttemptRecord {
                                query: Some(query.clone()),
                                error: Some(error.clone()),
                                elapsed,
                            });
                            run.after_failure(Some(query), error)
                        }
                    }
                }
                LoopState::Terminal(outcome) => break outcome,
            };
        };

        let outcome = match outcome {
            ChatOutcome::Success { rows, .. } if options.human_response => {
                let query = run.last_query.clone();
                let answer = self.answer(question, query.as_ref(), &rows, &mut run).await;
                ChatOutcome::Success {
                    rows,
                    answer: Some(answer),
                }
            }
            other => other,
        };

        match &outcome {
            ChatOutcome::Success { rows, .. } => info!(
                rows = rows.len(),
                retries = run.budget.used(),
                elapsed_ms = run.execution_time.as_millis(),
                "chat succeeded"
            ),
            ChatOutcome::Exhausted { error } => warn!(
                retries = run.budget.used(),
                error = %error,
                "retry budget exhausted"
            ),
        }

        Ok(ChatResult {
            query: run.last_query,
            outcome,
            execution_time: run.execution_time,
            retries_used: run.budget.used(),
            history: run.history,
            total_tokens: run.total_tokens,
        })
    }

    /// Lists the model identifiers the service offers.
    ///
    /// # Errors
    ///
    /// Propagates model gateway errors.
    pub async fn list_available_models(&self) -> Result<Vec<String>, NqlError> {
        self.provider.list_models().await
    }

    /// Checks that the configured model is offered by the service.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] naming the available models when
    /// the configured one is missing, and propagates gateway errors.
    pub async fn verify_model(&self) -> Result<(), NqlError> {
        let models = self.list_available_models().await?;
        if models.iter().any(|m| m == &self.config.model) {
            debug!(model = %self.config.model, "model is available");
            Ok(())
        } else {
            Err(NqlError::configuration(format!(
                "model '{}' is not available; available models: {}",
                self.config.model,
                if models.is_empty() {
                    "(none)".to_string()
                } else {
                    models.join(", ")
                }
            )))
        }
    }

    /// Phrases `rows` as a short answer to `question`.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Summarization`] on any failure.
    pub async fn summarize(&self, question: &str, query: &str, rows: &[Row]) -> Result<String, NqlError> {
        self.summarize_response(question, query, rows)
            .await
            .map(|response| response.content.trim().to_string())
    }

    async fn summarize_response(
        &self,
        question: &str,
        query: &str,
        rows: &[Row],
    ) -> Result<AgentResponse, NqlError> {
        let prompt = self
            .prompts
            .summarize(question, query, rows, self.config.summary_row_limit);
        self.summarizer
            .execute(self.provider.as_ref(), &prompt)
            .await
            .map_err(|e| NqlError::Summarization {
                message: e.to_string(),
            })
    }

    /// Summarization never fails the call: errors become [`Answer::Unavailable`].
    async fn answer(
        &self,
        question: &str,
        query: Option<&CandidateQuery>,
        rows: &[Row],
        run: &mut LoopRun,
    ) -> Answer {
        let query = query.map_or("", CandidateQuery::as_str);
        match self.summarize_response(question, query, rows).await {
            Ok(response) => {
                run.total_tokens = run.total_tokens.saturating_add(response.usage.total_tokens);
                Answer::Summary(response.content.trim().to_string())
            }
            Err(e) => {
                warn!(error = %e, "summarization failed; returning results without an answer");
                Answer::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Calls the SQL agent and extracts a candidate.
    async fn generate(&self, prompt: &Prompt, run: &mut LoopRun) -> Result<LoopState, NqlError> {
        let response = self.sql_agent.execute(self.provider.as_ref(), prompt).await?;
        run.total_tokens = run.total_tokens.saturating_add(response.usage.total_tokens);

        match extract_sql(&response.content) {
            Ok(query) => {
                debug!(attempt = run.history.len() + 1, sql = %query, "generated query");
                run.last_query = Some(query.clone());
                Ok(LoopState::Generated(query))
            }
            Err(e) if e.is_retryable() => Ok(LoopState::Malformed {
                content: response.content,
            }),
            Err(e) => Err(e),
        }
    }

    fn apply_dialect(&mut self) {
        if let Some(executor) = &self.executor {
            self.prompts = self.prompts.clone().with_dialect(executor.kind());
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("model", &self.config.model)
            .field("schema", self.prompts.schema())
            .field("connected", &self.executor.is_some())
            .finish()
    }
}

/// States of the correction loop.
#[derive(Debug)]
enum LoopState {
    /// Nothing generated yet.
    Init,
    /// A candidate was extracted and awaits execution.
    Generated(CandidateQuery),
    /// The model answered without a `SELECT`.
    Malformed { content: String },
    /// The candidate ran.
    Executed {
        query: CandidateQuery,
        outcome: ExecutionOutcome,
    },
    /// A correction is due for the failed attempt.
    Correcting {
        failed: Option<CandidateQuery>,
        error: String,
    },
    /// Done.
    Terminal(ChatOutcome),
}

/// Correction counter. At most `max + 1` attempts are ever made.
#[derive(Debug, Clone, Copy)]
struct RetryBudget {
    max: u32,
    used: u32,
}

impl RetryBudget {
    const fn new(max: u32) -> Self {
        Self { max, used: 0 }
    }

    /// Spends one correction if any remain.
    const fn try_consume(&mut self) -> bool {
        if self.used < self.max {
            self.used += 1;
            true
        } else {
            false
        }
    }

    const fn used(self) -> u32 {
        self.used
    }
}

/// Everything one `chat` call accumulates; dropped when the call returns.
#[derive(Debug)]
struct LoopRun {
    budget: RetryBudget,
    last_query: Option<CandidateQuery>,
    execution_time: Duration,
    history: Vec<AttemptRecord>,
    total_tokens: u32,
}

impl LoopRun {
    const fn new(max_retries: u32) -> Self {
        Self {
            budget: RetryBudget::new(max_retries),
            last_query: None,
            execution_time: Duration::ZERO,
            history: Vec::new(),
            total_tokens: 0,
        }
    }

    /// Correct if the budget allows, otherwise stop.
    fn after_failure(&mut self, failed: Option<CandidateQuery>, error: String) -> LoopState {
        if self.budget.try_consume() {
            info!(
                retry = self.budget.used(),
                max_retries = self.budget.max,
                "requesting correction"
            );
            LoopState::Correcting { failed, error }
        } else {
            LoopState::Terminal(ChatOutcome::Exhausted { error })
        }
    }
}

/// Runs the candidate on the blocking pool; a panicked worker is a failure.
async fn execute(executor: &Arc<dyn QueryExecutor>, query: &CandidateQuery) -> ExecutionOutcome {
    let executor = Arc::clone(executor);
    let sql = query.as_str().to_string();
    tokio::task::spawn_blocking(move || executor.execute(&sql))
        .await
        .unwrap_or_else(|e| ExecutionOutcome::Failure {
            error: format!("query execution aborted: {e}"),
            elapsed: Duration::ZERO,
        })
}

fn validate_question(question: &str) -> Result<(), NqlError> {
    if question.trim().is_empty() {
        return Err(NqlError::configuration("question cannot be empty"));
    }
    if question.len() > MAX_QUESTION_LEN {
        return Err(NqlError::configuration(format!(
            "question exceeds maximum length ({} bytes, max {MAX_QUESTION_LEN})",
            question.len()
        )));
    }
    Ok(())
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
