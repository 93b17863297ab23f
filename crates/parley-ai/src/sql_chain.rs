//! Natural-language questions answered with generated SQL

use anyhow::Result;
use parley_core::{ChatMessage, PromptTemplate, PromptValues};
use parley_sql::SqlDatabase;
use serde::Serialize;
use tracing::{debug, info};

use crate::model::ChatModel;
use crate::output::strip_code_fence;

pub const DEFAULT_TOP_K: usize = 5;

/// Prompt that turns a question into one SQLite query
pub const SQLITE_PROMPT: &str = r#"You are a SQLite expert. Given an input question, first create a syntactically correct SQLite query to run, then look at the results of the query and return the answer to the input question.
Unless the user specifies in the question a specific number of examples to obtain, query for at most {top_k} results using the LIMIT clause as per SQLite. You can order the results to return the most informative data in the database.
Never query for all columns from a table. You must query only the columns that are needed to answer the question. Wrap each column name in double quotes (") to denote them as delimited identifiers.
Pay attention to use only the column names you can see in the tables below. Be careful to not query for columns that do not exist. Also, pay attention to which column is in which table.
Pay attention to use date('now') function to get the current date, if the question involves "today".

Use the following format:

Question: Question here
SQLQuery: SQL Query to run
SQLResult: Result of the SQLQuery
Answer: Final answer here

Only use the following tables:
{table_info}

Question: {input}"#;

/// Prompt that phrases the final answer from the query and its result
pub const ANSWER_PROMPT: &str = "Given the following user question, corresponding SQL query, and SQL result, answer the user question.\n\n\
Question: {question}\n\
SQL Query: {query}\n\
SQL Result: {result}\n\
Answer: ";

const QUERY_SUFFIX: &str = "\nSQLQuery: ";
const STOP_SEQUENCE: &str = "\nSQLResult:";

/// Cut a reply at the point where the model starts inventing results
fn truncate_at_stop(reply: &str) -> &str {
    match reply.find(STOP_SEQUENCE) {
        Some(idx) => &reply[..idx],
        None => reply,
    }
}

/// Remove the `SQLQuery:` label and any code fence around a generated query
pub fn strip_query_prefix(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(idx) = text.find("SQLQuery:") {
        text = &text[idx + "SQLQuery:".len()..];
    }
    strip_code_fence(text).trim().to_string()
}

/// Everything produced while answering one question
#[derive(Debug, Clone, Serialize)]
pub struct SqlAnswer {
    pub question: String,
    pub query: String,
    pub result: String,
    pub answer: String,
}

pub struct SqlQueryChain<M> {
    model: M,
    db: SqlDatabase,
    top_k: usize,
    table_names: Option<Vec<String>>,
}

impl<M: ChatModel> SqlQueryChain<M> {
    pub fn new(model: M, db: SqlDatabase) -> Self {
        Self {
            model,
            db,
            top_k: DEFAULT_TOP_K,
            table_names: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Restrict the schema shown to the model
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.table_names = Some(tables);
        self
    }

    pub fn database(&self) -> &SqlDatabase {
        &self.db
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn query_prompt(&self, question: &str) -> Result<String> {
        let table_info = self.db.table_info(self.table_names.as_deref()).await?;
        let values = PromptValues::new()
            .with("top_k", self.top_k.to_string())
            .with("table_info", table_info)
            .with("input", format!("{}{}", question, QUERY_SUFFIX));
        Ok(PromptTemplate::from_template(SQLITE_PROMPT).format(&values)?)
    }

    /// Ask the model for a query; returns the reply up to the stop sequence
    pub async fn write_query(&self, question: &str) -> Result<String> {
        let prompt = self.query_prompt(question).await?;
        info!("Generating SQL with {}", self.model.model_name());

        let reply = self.model.invoke(&[ChatMessage::human(prompt)]).await?;
        Ok(truncate_at_stop(&reply).to_string())
    }

    /// Generate a query and run it. Failures come back as `Error: ...` text.
    pub async fn write_and_execute(&self, question: &str) -> Result<(String, String)> {
        let raw = self.write_query(question).await?;
        let query = strip_query_prefix(&raw);
        debug!("Executing generated SQL: {}", query);

        let result = self.db.run_no_throw(&query).await;
        Ok((query, result))
    }

    pub async fn answer(&self, question: &str) -> Result<SqlAnswer> {
        let (query, result) = self.write_and_execute(question).await?;

        let values = PromptValues::new()
            .with("question", question)
            .with("query", query.as_str())
            .with("result", result.as_str());
        let prompt = PromptTemplate::from_template(ANSWER_PROMPT).format(&values)?;
        let answer = self.model.invoke(&[ChatMessage::human(prompt)]).await?;

        Ok(SqlAnswer {
            question: question.to_string(),
            query,
            result,
            answer: answer.trim().to_string(),
        })
    }
}
