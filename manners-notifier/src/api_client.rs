use crate::traits::TriviaSource;
use crate::types::{
    ApiConfig, NotifierError, Result, TriviaItem, UserLevel, UserOut, UserVote, Vote, VotePayload, VoteStats,
};
use crate::validation::Credentials;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Client for the trivia REST API.
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.config.base_url.join(path)?)
    }

    pub async fn list_trivia(&self) -> Result<Vec<TriviaItem>> {
        let url = self.endpoint("common_sense/")?;
        let items: Vec<TriviaItem> = self.get_json(url, "fetch trivia").await?;
        info!("Fetched {} trivia items", items.len());
        Ok(items)
    }

    pub async fn get_trivia(&self, id: i64) -> Result<TriviaItem> {
        let url = self.endpoint(&format!("common_sense/{}", id))?;
        self.get_json(url, "fetch trivia detail").await
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<UserOut> {
        let url = self.endpoint("auth/register")?;
        let user: UserOut = self.post_json(url, credentials, "register").await?;
        info!("Registered user {} (ID: {})", user.user_name, user.user_id);
        Ok(user)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserOut> {
        let url = self.endpoint("auth/login")?;
        let user: UserOut = self.post_json(url, credentials, "login").await?;
        info!("Logged in as {} (ID: {})", user.user_name, user.user_id);
        Ok(user)
    }

    /// Record a vote. The server upserts, so voting again replaces the previous answer.
    pub async fn vote(&self, payload: &VotePayload) -> Result<()> {
        let url = self.endpoint("vote/")?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(payload).send().await?;
        Self::check_status(response, "vote").await?;
        info!(
            "Recorded vote for trivia {} by user {} (recognized: {})",
            payload.trivia_item_id, payload.user_id, payload.recognized
        );
        Ok(())
    }

    /// The user's existing vote on an item; `None` if they have not voted yet.
    pub async fn check_vote(&self, user_id: i64, trivia_item_id: i64) -> Result<Option<Vote>> {
        let mut url = self.endpoint("vote/check")?;
        url.query_pairs_mut()
            .append_pair("user_id", &user_id.to_string())
            .append_pair("common_sense_id", &trivia_item_id.to_string());

        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No vote yet for trivia {} by user {}", trivia_item_id, user_id);
            return Ok(None);
        }
        let response = Self::check_status(response, "check vote").await?;
        Ok(Some(response.json().await?))
    }

    pub async fn vote_stats(&self, trivia_item_id: i64) -> Result<VoteStats> {
        let url = self.endpoint(&format!("vote/stats/{}", trivia_item_id))?;
        self.get_json(url, "fetch vote stats").await
    }

    pub async fn user_votes(&self, user_id: i64) -> Result<Vec<UserVote>> {
        let url = self.endpoint(&format!("vote/user/details/{}", user_id))?;
        self.get_json(url, "fetch user votes").await
    }

    pub async fn user_level(&self, user_id: i64) -> Result<UserLevel> {
        let url = self.endpoint(&format!("auth/level/{}", user_id))?;
        self.get_json(url, "fetch user level").await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, operation: &str) -> Result<T> {
        let start_time = Instant::now();
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let response = Self::check_status(response, operation).await?;
        let body = response.json().await?;
        debug!("GET {} finished in {:?}", url, start_time.elapsed());
        Ok(body)
    }

    async fn post_json<B, T>(&self, url: Url, body: &B, operation: &str) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        let response = Self::check_status(response, operation).await?;
        Ok(response.json().await?)
    }

    /// Pass 2xx responses through; turn anything else into `NotifierError::Api`
    /// carrying the server's `detail` when it sent one.
    async fn check_status(response: Response, operation: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .map(|detail| match detail {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
            .unwrap_or_else(|| format!("{} failed: {}", operation, status.as_u16()));

        warn!("{} failed with HTTP {}: {}", operation, status, detail);
        Err(NotifierError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl TriviaSource for ApiClient {
    async fn catalog(&self) -> Result<Vec<TriviaItem>> {
        self.list_trivia().await
    }
}
