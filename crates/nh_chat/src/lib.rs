use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use nh_core::filter::{ArticleQuery, ClusterQuery};
use nh_core::{Embedder, Error, NewsSearch, Result};

pub mod agent;
pub mod prompt;
pub mod session;
pub mod tools;

pub use agent::{ChatAgent, ChatMessage, ToolCall};
pub use session::SessionStore;
pub use tools::{tool_definitions, NewsTools, ToolOutput};

/// An assistant turn may request tools this many times before the
/// conversation is considered stuck.
const MAX_TOOL_ROUNDS: usize = 4;

/// The news chat service: system prompt, retrieval tools, session store and
/// the tool-calling loop. All collaborators are injected explicitly.
pub struct NewsChat {
    agent: ChatAgent,
    tools: NewsTools,
    sessions: SessionStore,
}

impl NewsChat {
    pub fn new(
        search: Arc<dyn NewsSearch>,
        embedder: Arc<dyn Embedder>,
        api_key: String,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            agent: ChatAgent::new(api_key, base_url, model),
            tools: NewsTools::new(search, embedder),
            sessions: SessionStore::new(),
        }
    }

    pub async fn create_session(&self) -> String {
        let today = Utc::now().format("%A, %B %-d, %Y").to_string();
        let system = ChatMessage::system(prompt::system_prompt(&today));
        let id = self.sessions.create(vec![system]).await;
        info!(session = %id, "created chat session");
        id
    }

    /// Run one user turn: send, execute any requested tool calls, resend,
    /// until the model produces a final text answer.
    pub async fn query(&self, session_id: &str, message: &str) -> Result<String> {
        let mut messages = self
            .sessions
            .history(session_id)
            .await
            .ok_or_else(|| Error::Chat(format!("unknown session: {}", session_id)))?;
        messages.push(ChatMessage::user(message));

        let definitions = tool_definitions();
        for _ in 0..MAX_TOOL_ROUNDS {
            let reply = self.agent.complete(&messages, &definitions).await?;
            let tool_calls = reply.tool_calls.clone().unwrap_or_default();
            messages.push(reply.clone());

            if tool_calls.is_empty() {
                let answer = reply.content.unwrap_or_default().trim().to_string();
                self.sessions.replace(session_id, messages).await;
                if answer.is_empty() {
                    return Ok("No response generated.".to_string());
                }
                return Ok(answer);
            }

            for call in tool_calls {
                let output = self.dispatch(&call).await?;
                messages.push(ChatMessage::tool(call.id.clone(), output));
            }
        }

        self.sessions.replace(session_id, messages).await;
        Err(Error::Chat(
            "tool-call budget exhausted without a final answer".to_string(),
        ))
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<String> {
        match call.function.name.as_str() {
            "search_clusters" => {
                let args: ClusterQuery = serde_json::from_str(&call.function.arguments)?;
                let output = self.tools.search_clusters(args).await?;
                Ok(serde_json::to_string(&output)?)
            }
            "search_articles" => {
                let args: ArticleQuery = serde_json::from_str(&call.function.arguments)?;
                let output = self.tools.search_articles(args).await?;
                Ok(serde_json::to_string(&output)?)
            }
            other => Err(Error::Chat(format!("unknown tool: {}", other))),
        }
    }
}

impl std::fmt::Debug for NewsChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsChat")
            .field("agent", &self.agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent::FunctionCall;
    use nh_core::models::parse_timestamp;
    use nh_core::{Article, Category, Cluster};
    use nh_inference::DummyEmbedder;
    use nh_storage::MemoryStore;

    async fn chat_over_memory() -> NewsChat {
        let store = MemoryStore::new();
        store
            .insert_cluster(
                Cluster {
                    cluster_id: "c1".to_string(),
                    title: "transfer window".to_string(),
                    summary: String::new(),
                    category: Some(Category::Sports),
                    num_articles: 1,
                    keywords: Vec::new(),
                },
                None,
            )
            .await;
        store
            .insert_article(
                Article {
                    url: "http://example.com/1".to_string(),
                    title: "a signing".to_string(),
                    author: None,
                    published: parse_timestamp("2026-01-20T08:00:00Z"),
                    summary: String::new(),
                    category: Some(Category::Sports),
                    source: Some("wire".to_string()),
                    cluster_id: Some("c1".to_string()),
                },
                None,
            )
            .await;
        NewsChat::new(
            Arc::new(store),
            Arc::new(DummyEmbedder::new()),
            "test-key".to_string(),
            "http://localhost:0",
            "gpt-4o",
        )
    }

    #[tokio::test]
    async fn sessions_start_with_the_system_prompt() {
        let chat = chat_over_memory().await;
        let id = chat.create_session().await;
        let history = chat.sessions.history(&id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, "system");
    }

    #[tokio::test]
    async fn query_against_unknown_session_fails() {
        let chat = chat_over_memory().await;
        assert!(chat.query("nope", "hello").await.is_err());
    }

    #[tokio::test]
    async fn dispatch_runs_cluster_tool_from_raw_arguments() {
        let chat = chat_over_memory().await;
        let call = ToolCall {
            id: "call_1".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: "search_clusters".to_string(),
                arguments: "{\"query\": \"transfer\", \"category\": \"Sports\"}".to_string(),
            },
        };
        let output = chat.dispatch(&call).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["results"][0]["cluster_id"], "c1");
    }

    #[tokio::test]
    async fn dispatch_runs_article_tool_with_defaults() {
        let chat = chat_over_memory().await;
        let call = ToolCall {
            id: "call_2".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: "search_articles".to_string(),
                arguments: "{\"cluster_id\": \"c1\"}".to_string(),
            },
        };
        let output = chat.dispatch(&call).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["results"][0]["cluster"]["cluster_id"], "c1");
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_tools() {
        let chat = chat_over_memory().await;
        let call = ToolCall {
            id: "call_3".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: "drop_tables".to_string(),
                arguments: "{}".to_string(),
            },
        };
        assert!(chat.dispatch(&call).await.is_err());
    }
}
