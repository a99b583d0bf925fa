//! The client facade.

use std::sync::Arc;

use carto_sql_core::ident::quote_literal;
use carto_sql_core::{compile, materialize_all, Operation, SchemaBuilder};
use futures::stream::{Stream, TryStreamExt};
use tracing::debug;

use crate::batch::{self, JobSummary};
use crate::bulk::{self, BulkOptions, BulkSummary, Feature};
use crate::config::ClientConfig;
use crate::decode::{Row, RowStream};
use crate::error::Result;
use crate::transport::Transport;

/// Per-call execution options.
///
/// ```rust
/// use carto_sql::ExecOptions;
///
/// let options = ExecOptions::batch().on_error("select log_failure()");
/// assert!(options.batch);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Run as an asynchronous batch job instead of a direct query.
    pub batch: bool,
    /// Statement the job runs after success.
    pub on_success: Option<String>,
    /// Statement the job runs after failure.
    pub on_error: Option<String>,
}

impl ExecOptions {
    /// Options for a batch job.
    #[must_use]
    pub fn batch() -> Self {
        Self {
            batch: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn on_success(mut self, sql: impl Into<String>) -> Self {
        self.on_success = Some(sql.into());
        self
    }

    #[must_use]
    pub fn on_error(mut self, sql: impl Into<String>) -> Self {
        self.on_error = Some(sql.into());
        self
    }
}

/// What [`Client::execute`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    Rows(Vec<Row>),
    Job(JobSummary),
}

/// Executes operations against one SQL endpoint.
///
/// Cloning is cheap; clones share the HTTP connection pool and config.
#[derive(Debug, Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Transport,
}

impl Client {
    /// Creates a client with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_http(config, http))
    }

    /// Creates a client on top of an existing HTTP client.
    pub fn with_http(config: ClientConfig, http: reqwest::Client) -> Self {
        let config = Arc::new(config);
        let transport = Transport::new(http, Arc::clone(&config));
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Compiles and materializes an operation without sending it.
    ///
    /// # Errors
    ///
    /// Returns the compile or encoding error.
    pub fn to_sql(&self, op: &Operation) -> Result<String> {
        let statements = compile(op)?;
        Ok(materialize_all(
            &statements,
            self.config.timezone,
            op.envelope(),
        )?)
    }

    /// Runs an operation and collects its rows.
    ///
    /// # Errors
    ///
    /// Compile and encoding errors come back before any request is made.
    pub async fn query(&self, op: impl Into<Operation>) -> Result<Vec<Row>> {
        let op = op.into();
        let sql = self.to_sql(&op)?;
        let rows = self.query_sql(&sql).await?;
        self.finalize(&op).await?;
        Ok(rows)
    }

    /// Runs an operation and streams its rows as they arrive.
    ///
    /// An operation that creates a table is run to completion first, so the
    /// table is finalized before any row is handed out.
    ///
    /// # Errors
    ///
    /// Errors before the response starts are returned here; later ones are
    /// items of the stream.
    pub async fn stream(&self, op: impl Into<Operation>) -> Result<RowStream> {
        let op = op.into();
        let sql = self.to_sql(&op)?;
        let rows = self.stream_sql(&sql).await?;
        if op.created_table().is_none() {
            return Ok(rows);
        }
        let rows = rows.buffered().await?;
        self.finalize(&op).await?;
        Ok(rows)
    }

    /// Runs an operation directly or as a batch job.
    ///
    /// # Errors
    ///
    /// As [`query`](Self::query), plus [`Error::JobFailed`](crate::Error::JobFailed)
    /// for batch jobs.
    pub async fn execute(&self, op: impl Into<Operation>, options: &ExecOptions) -> Result<Execution> {
        let op = op.into();
        let sql = self.to_sql(&op)?;
        let execution = self.execute_sql(&sql, options).await?;
        self.finalize(&op).await?;
        Ok(execution)
    }

    /// Runs literal SQL and collects its rows.
    ///
    /// # Errors
    ///
    /// Transport, remote and decode errors.
    pub async fn query_sql(&self, sql: &str) -> Result<Vec<Row>> {
        self.stream_sql(sql).await?.try_collect().await
    }

    /// Runs literal SQL and streams its rows.
    ///
    /// The response status and headers are on the returned stream.
    ///
    /// # Errors
    ///
    /// Transport and remote errors raised before the body starts.
    pub async fn stream_sql(&self, sql: &str) -> Result<RowStream> {
        let response = self.transport.send(sql).await?;
        Ok(RowStream::new(response))
    }

    /// Runs literal SQL directly or as a batch job.
    ///
    /// # Errors
    ///
    /// As [`query_sql`](Self::query_sql), plus job failures.
    pub async fn execute_sql(&self, sql: &str, options: &ExecOptions) -> Result<Execution> {
        if options.batch {
            let summary = batch::run_job(
                &self.transport,
                sql,
                options.on_success.as_deref(),
                options.on_error.as_deref(),
            )
            .await?;
            return Ok(Execution::Job(summary));
        }
        Ok(Execution::Rows(self.query_sql(sql).await?))
    }

    /// Whether `table` exists.
    ///
    /// # Errors
    ///
    /// Any error of the lookup query.
    pub async fn has_table(&self, table: &str) -> Result<bool> {
        let rows = self.query(SchemaBuilder::new().has_table(table)).await?;
        Ok(!rows.is_empty())
    }

    /// Whether `table` has `column`.
    ///
    /// # Errors
    ///
    /// Any error of the lookup query.
    pub async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let rows = self.query(SchemaBuilder::new().has_column(table, column)).await?;
        Ok(!rows.is_empty())
    }

    /// Loads features into `table`.
    ///
    /// Returns once the input has ended and every insert has completed.
    ///
    /// # Errors
    ///
    /// The first failed insert (or table creation) ends the load; inserts
    /// already running are awaited before it is returned.
    pub async fn bulk_insert<S>(&self, table: &str, features: S, options: BulkOptions) -> Result<BulkSummary>
    where
        S: Stream<Item = Feature>,
    {
        bulk::load(self, table, features, options).await
    }

    /// Turns a freshly created table into a spatial table.
    async fn finalize(&self, op: &Operation) -> Result<()> {
        let Some(table) = op.created_table() else {
            return Ok(());
        };
        debug!(table, "finalizing created table");
        let sql = format!("select cdb_cartodbfytable({})", quote_literal(table));
        self.query_sql(&sql).await?;
        Ok(())
    }
}
