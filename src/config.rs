use anyhow::Result;
use dotenvy::dotenv;
use std::env;

use crate::application::CohereClient;

pub const DEFAULT_DATABASE: &str = "banco.db";
pub const DEFAULT_ASSISTANT_MODEL: &str = "command-r-plus";
pub const DEFAULT_ASSISTANT_URL: &str = "https://api.cohere.ai/v1/chat";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub assistant: AssistantConfig,
}

/// Settings handed to the completion client.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            database_path: env::var("BANCO_DATABASE")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            assistant: AssistantConfig {
                api_key: env::var("COHERE_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                model: env::var("BANCO_ASSISTANT_MODEL")
                    .unwrap_or_else(|_| DEFAULT_ASSISTANT_MODEL.to_string()),
                url: env::var("BANCO_ASSISTANT_URL")
                    .unwrap_or_else(|_| DEFAULT_ASSISTANT_URL.to_string()),
            },
        })
    }
}

impl AssistantConfig {
    pub fn client(&self) -> CohereClient {
        CohereClient::new(self.api_key.clone(), self.model.clone(), self.url.clone())
    }
}
