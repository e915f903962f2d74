use crate::config::LlmConfig;
use crate::exec::DbEngine;
use crate::llm::models::{
    ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl, MessageContent,
};
use crate::llm::{extract_sql, LlmError, SchemaGenerator};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        // API key comes from the config file or, more commonly, the
        // environment; it is never part of request payloads we log.
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                LlmError::ConfigError(
                    "API key is required (llm.api_key or OPENAI_API_KEY)".to_string(),
                )
            })?;

        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            model: config.model.clone(),
        })
    }

    fn text_prompt(&self, description: &str, engine: DbEngine) -> String {
        format!(
            r#"
### Instructions:
You design relational database schemas. Convert the description below into SQL DDL for {dialect}.
Adhere to these rules:
- Emit only SQL that is valid for {dialect}
- Give every table a primary key and use foreign keys for the relationships the description implies
- Use a junction table for each many-to-many relationship
- Pick sensible column types for the attributes mentioned
- Return a single ```sql code block and nothing else

### Description:
{description}

### Response:
"#,
            dialect = engine.dialect_name(),
            description = description,
        )
    }

    fn diagram_prompt(&self, engine: DbEngine) -> String {
        format!(
            r#"
### Instructions:
The attached image is an entity-relationship diagram. Read its entities, attributes and relationships and produce the SQL DDL that implements the diagram for {dialect}.
Adhere to these rules:
- Emit only SQL that is valid for {dialect}
- Preserve the diagram's primary keys; infer one where the diagram leaves it out
- Express one-to-many relationships as foreign keys and many-to-many relationships as junction tables
- Return a single ```sql code block and nothing else

### Response:
"#,
            dialect = engine.dialect_name(),
        )
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ResponseError(format!(
                "API responded with status code: {}{}",
                status,
                if body.is_empty() {
                    String::new()
                } else {
                    format!(" - {}", body)
                }
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseError("No choices in response".to_string()))?;

        Ok(choice.message.content)
    }
}

#[async_trait]
impl SchemaGenerator for OpenAiProvider {
    async fn sql_from_text(
        &self,
        description: &str,
        engine: DbEngine,
    ) -> Result<String, LlmError> {
        let prompt = self.text_prompt(description, engine);
        debug!(engine = %engine, "prepared text prompt");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Text(prompt),
            }],
            temperature: 0.1,
            max_tokens: 2000,
        };

        let content = self.complete(request).await?;
        let sql = extract_sql(&content);

        if sql.trim().is_empty() {
            return Err(LlmError::ResponseError(
                "model returned no SQL".to_string(),
            ));
        }

        info!(engine = %engine, "generated sql from description");
        Ok(sql)
    }

    async fn sql_from_diagram(
        &self,
        image: &[u8],
        content_type: &str,
        engine: DbEngine,
    ) -> Result<String, LlmError> {
        let prompt = self.diagram_prompt(engine);
        let data_url = format!("data:{};base64,{}", content_type, STANDARD.encode(image));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Parts(vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ]),
            }],
            temperature: 0.1,
            max_tokens: 2000,
        };

        let content = self.complete(request).await?;
        let sql = extract_sql(&content);

        if sql.trim().is_empty() {
            return Err(LlmError::ResponseError(
                "model returned no SQL".to_string(),
            ));
        }

        info!(engine = %engine, bytes = image.len(), "generated sql from diagram");
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: "test-key".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn text_prompt_embeds_dialect_and_description_verbatim() {
        let description = "Create a database for a blog with users, posts, and comments";
        let prompt = provider().text_prompt(description, DbEngine::Sqlite);
        assert!(prompt.contains("sqlite"));
        assert!(prompt.contains(description));
    }

    #[test]
    fn text_prompt_tracks_selected_engine() {
        let p = provider();
        assert!(p.text_prompt("x", DbEngine::Mysql).contains("mysql"));
        assert!(!p.text_prompt("x", DbEngine::Mysql).contains("postgresql"));
        assert!(p
            .text_prompt("x", DbEngine::Postgresql)
            .contains("postgresql"));
    }

    #[test]
    fn diagram_prompt_embeds_dialect() {
        let prompt = provider().diagram_prompt(DbEngine::Postgresql);
        assert!(prompt.contains("postgresql"));
        assert!(prompt.contains("entity-relationship"));
    }

    #[test]
    fn vision_message_serializes_with_image_part() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: "prompt".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AAAA".to_string(),
                        },
                    },
                ]),
            }],
            temperature: 0.1,
            max_tokens: 10,
        };
        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }
}
