//! Bundled walkthroughs with fixed inputs

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use parley_ai::{
    ChatModel, Chatbot, ConversationChain, ExtractionChain, SqlQueryChain, TaggingChain,
};
use parley_history::{ConversationMemory, FileChatHistory};
use parley_schema::{People, Person};
use parley_sql::SqlDatabase;
use serde_json::Value;

const SEPARATOR: &str = "\n----------\n";

pub const SINGLE_PERSON_COMMENT: &str = "I absolutely love this product! It's been a game-changer for my daily routine. The quality is top-notch and the customer service is outstanding. I've recommended it to all my friends and family. - Sarah Johnson, USA";

pub const SINGLE_COMMENT_AS_LIST: &str = "I'm so impressed with this product! It has truly transformed how I approach my daily tasks. The quality exceeds my expectations, and the customer support is truly exceptional. I've already suggested it to all my colleagues and relatives. - Emily Clarke, Canada";

pub const SEVERAL_REVIEWERS: &str = "\nAlice Johnson from Canada recently reviewed a book she loved. Meanwhile, Bob Smith from the USA shared his insights on the same book in a different review. Both reviews were very insightful.\n";

pub const TRUMP_FOLLOWER: &str = "I'm confident that President Trump's leadership and track record will once again resonate with Americans. His strong stance on economic growth and national security is exactly what our country needs at this pivotal moment. We need to bring back the proven leadership that can make America great again!";

pub const BIDEN_FOLLOWER: &str = "I believe President Biden's compassionate and steady approach is vital for our nation right now. His commitment to healthcare reform, climate change, and restoring our international alliances is crucial. It's time to continue the progress and ensure a future that benefits all Americans.";

pub const TREE_QUESTION: &str = "List the species of trees that are present in San Francisco";

const STATELESS_MESSAGES: [&str; 2] = ["My favorite color is blue.", "What is my favorite color?"];
const REMEMBERED_MESSAGES: [&str; 3] = ["hello!", "my name is Julio", "what is my name?"];

/// Heading and body framed by separators
fn section<W: Write>(out: &mut W, heading: &str, body: &str) -> Result<()> {
    writeln!(out, "{}", SEPARATOR)?;
    writeln!(out, "{}", heading)?;
    writeln!(out, "{}", SEPARATOR)?;
    writeln!(out, "{}", body)?;
    writeln!(out, "{}", SEPARATOR)?;
    Ok(())
}

fn pretty(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn chatbot<M: ChatModel, W: Write>(model: M, history: &Path, out: &mut W) -> Result<()> {
    let bot = Chatbot::new(&model);
    for message in STATELESS_MESSAGES {
        let reply = bot.ask(message).await?;
        section(out, message, &reply)?;
    }

    let memory = ConversationMemory::new(FileChatHistory::new(history)?);
    let mut chain = ConversationChain::new(&model, memory);
    for message in REMEMBERED_MESSAGES {
        let reply = chain.send(message).await?;
        section(out, message, &reply)?;
    }
    Ok(())
}

pub async fn extraction<M: ChatModel, W: Write>(model: M, out: &mut W) -> Result<()> {
    let person = ExtractionChain::<_, Person>::new(&model)
        .extract_value(SINGLE_PERSON_COMMENT)
        .await?;
    section(out, "Key data extraction (single person):", &pretty(&person)?)?;

    let people = ExtractionChain::<_, People>::new(&model);
    let single = people.extract_value(SINGLE_COMMENT_AS_LIST).await?;
    section(
        out,
        "Key data extraction of a list of entities (single comment):",
        &pretty(&single)?,
    )?;

    let several = people.extract_value(SEVERAL_REVIEWERS).await?;
    section(
        out,
        "Key data extraction of a review with several users:",
        &pretty(&several)?,
    )?;
    Ok(())
}

pub async fn sentiment<M: ChatModel, W: Write>(model: M, out: &mut W) -> Result<()> {
    let basic = TaggingChain::classification(&model);
    let value = basic.tag_value(TRUMP_FOLLOWER).await?;
    section(out, "Sentiment analysis Trump follower (basic):", &pretty(&value)?)?;
    let value = basic.tag_value(BIDEN_FOLLOWER).await?;
    section(out, "Sentiment analysis Biden follower (basic):", &pretty(&value)?)?;

    let enums = TaggingChain::classification_with_enums(&model);
    let value = enums.tag_value(TRUMP_FOLLOWER).await?;
    section(
        out,
        "Sentiment analysis Trump follower (with a list of options using enums):",
        &pretty(&value)?,
    )?;
    let value = enums.tag_value(BIDEN_FOLLOWER).await?;
    section(
        out,
        "Sentiment analysis Biden follower (with a list of options using enums):",
        &pretty(&value)?,
    )?;
    Ok(())
}

pub async fn sql<M: ChatModel, W: Write>(
    model: M,
    db: SqlDatabase,
    top_k: usize,
    out: &mut W,
) -> Result<()> {
    let chain = SqlQueryChain::new(&model, db).with_top_k(top_k);

    let raw = chain.write_query(TREE_QUESTION).await?;
    section(out, "Generated SQL Query:", &raw)?;

    // A refused or failing query is shown, not fatal
    let query = parley_ai::sql_chain::strip_query_prefix(&raw);
    let result = chain.database().run_no_throw(&query).await;
    section(out, "Query executed:", &result)?;

    let (_, result) = chain.write_and_execute(TREE_QUESTION).await?;
    section(
        out,
        &format!("{} (with query execution included):", TREE_QUESTION),
        &result,
    )?;

    let answer = chain.answer(TREE_QUESTION).await?;
    section(
        out,
        &format!("{} (passing question and result to the LLM):", TREE_QUESTION),
        &answer.answer,
    )?;

    chain.database().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::ChatMessage;
    use parley_history::ChatHistory;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Answers every prompt with its last message echoed back
    struct EchoModel {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
            Ok(format!("echo: {}", last))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    /// Replays canned replies in order
    struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            }
        }

        fn remaining(&self) -> usize {
            self.replies.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("scripted model ran out of replies"))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn printed(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    async fn seed_trees(dir: &TempDir) -> SqlDatabase {
        let path = dir.path().join("street_tree_db.sqlite");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true),
            )
            .await
            .unwrap();
        sqlx::query("CREATE TABLE street_trees (tree_id INTEGER PRIMARY KEY, species TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO street_trees (species) VALUES ('Coast Live Oak'), ('Monterey Pine')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
        SqlDatabase::from_uri(&format!("sqlite:///{}", path.display()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_extraction_walkthrough_prints_each_record() {
        let model = ScriptedModel::new(&[
            r#"{"name": "Sarah", "lastname": "Johnson", "country": "USA"}"#,
            "```json\n{\"people\": [{\"name\": \"Emily\", \"lastname\": \"Clarke\", \"country\": \"Canada\"}]}\n```",
            r#"Sure! {"people": [{"name": "Alice", "lastname": "Johnson", "country": "Canada"}, {"name": "Bob", "lastname": "Smith", "country": "USA"}]}"#,
        ]);
        let mut out = Vec::new();

        extraction(&model, &mut out).await.unwrap();

        let text = printed(out);
        assert_eq!(model.remaining(), 0);
        assert!(text.starts_with(&format!("{}\nKey data extraction (single person):\n", SEPARATOR)));
        assert!(text.contains("\"lastname\": \"Johnson\""));
        assert!(text.contains("Key data extraction of a list of entities (single comment):"));
        assert!(text.contains("\"name\": \"Emily\""));
        assert!(text.contains("Key data extraction of a review with several users:"));
        assert!(text.contains("\"name\": \"Bob\""));
        assert_eq!(text.matches("----------").count(), 9);
    }

    #[tokio::test]
    async fn test_extraction_walkthrough_stops_on_bad_reply() {
        let model = ScriptedModel::new(&[r#"{"lastname": "Johnson"}"#, "unused"]);
        let mut out = Vec::new();

        assert!(extraction(&model, &mut out).await.is_err());
        assert!(out.is_empty());
        assert_eq!(model.remaining(), 1);
    }

    #[tokio::test]
    async fn test_sentiment_walkthrough_covers_both_followers() {
        let model = ScriptedModel::new(&[
            r#"{"sentiment": "confident", "political_tendency": "conservative", "language": "english"}"#,
            r#"{"sentiment": "hopeful", "political_tendency": "liberal", "language": "english"}"#,
            r#"{"sentiment": "happy", "political_tendency": "conservative", "language": "english"}"#,
            r#"{"sentiment": "neutral", "political_tendency": "liberal", "language": "english"}"#,
        ]);
        let mut out = Vec::new();

        sentiment(&model, &mut out).await.unwrap();

        let text = printed(out);
        assert_eq!(model.remaining(), 0);
        let headings = [
            "Sentiment analysis Trump follower (basic):",
            "Sentiment analysis Biden follower (basic):",
            "Sentiment analysis Trump follower (with a list of options using enums):",
            "Sentiment analysis Biden follower (with a list of options using enums):",
        ];
        let positions: Vec<usize> = headings
            .iter()
            .map(|h| text.find(h).unwrap_or_else(|| panic!("missing {h}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("\"sentiment\": \"confident\""));
        assert!(text.contains("\"sentiment\": \"neutral\""));
    }

    #[tokio::test]
    async fn test_sentiment_walkthrough_rejects_label_outside_enum() {
        let model = ScriptedModel::new(&[
            r#"{"sentiment": "confident", "political_tendency": "conservative", "language": "english"}"#,
            r#"{"sentiment": "hopeful", "political_tendency": "liberal", "language": "english"}"#,
            r#"{"sentiment": "confident", "political_tendency": "conservative", "language": "english"}"#,
        ]);
        let mut out = Vec::new();

        assert!(sentiment(&model, &mut out).await.is_err());
        let text = printed(out);
        assert!(text.contains("Sentiment analysis Biden follower (basic):"));
        assert!(!text.contains("(with a list of options using enums)"));
    }

    #[tokio::test]
    async fn test_sql_walkthrough_runs_every_step() {
        let dir = TempDir::new().unwrap();
        let db = seed_trees(&dir).await;
        let model = ScriptedModel::new(&[
            "SQLQuery: SELECT DISTINCT \"species\" FROM street_trees ORDER BY \"species\" LIMIT 5;",
            "```sql\nSELECT COUNT(*) FROM street_trees;\n```",
            "SELECT \"species\" FROM street_trees ORDER BY \"species\" LIMIT 1;",
            "Coast Live Oak and Monterey Pine.",
        ]);
        let mut out = Vec::new();

        sql(&model, db, 5, &mut out).await.unwrap();

        let text = printed(out);
        assert_eq!(model.remaining(), 0);
        assert!(text.contains("Generated SQL Query:"));
        assert!(text.contains(&format!(
            "Query executed:\n{}\n[('Coast Live Oak',), ('Monterey Pine',)]\n",
            SEPARATOR
        )));
        assert!(text.contains(&format!(
            "{} (with query execution included):\n{}\n[(2,)]\n",
            TREE_QUESTION, SEPARATOR
        )));
        assert!(text.contains(&format!(
            "{} (passing question and result to the LLM):\n{}\nCoast Live Oak and Monterey Pine.\n",
            TREE_QUESTION, SEPARATOR
        )));
    }

    #[tokio::test]
    async fn test_sql_walkthrough_shows_refused_query_and_continues() {
        let dir = TempDir::new().unwrap();
        let db = seed_trees(&dir).await;
        let model = ScriptedModel::new(&[
            "SQLQuery: DROP TABLE street_trees;",
            "SELECT COUNT(*) FROM street_trees;",
            "SELECT COUNT(*) FROM street_trees;",
            "There are 2 trees.",
        ]);
        let mut out = Vec::new();

        sql(&model, db, 5, &mut out).await.unwrap();

        let text = printed(out);
        assert_eq!(model.remaining(), 0);
        assert!(text.contains("Error: only read statements are allowed"));
        assert!(text.contains("[(2,)]"));
        assert!(text.contains("There are 2 trees."));
    }

    #[tokio::test]
    async fn test_chatbot_walkthrough_persists_remembered_turns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.json");
        let model = EchoModel {
            calls: Mutex::new(0),
        };

        chatbot(&model, &path, &mut Vec::new()).await.unwrap();

        assert_eq!(*model.calls.lock().unwrap(), 5);
        let stored = FileChatHistory::new(&path).unwrap().messages().unwrap();
        assert_eq!(stored.len(), 6);
        assert_eq!(stored[0], ChatMessage::human("hello!"));
        assert_eq!(stored[1], ChatMessage::ai("echo: hello!"));
        assert_eq!(stored[5], ChatMessage::ai("echo: what is my name?"));
    }
}
