use super::{
    models::{CollectionResponse, Identity, ReleaseDetail, SearchHit, SearchResponse},
    processing,
};
use crate::{
    error::{Result, SleeveError},
    resolver::{chain::DISCOGS_SEARCH, IdKind, ResolvedEntity, TypedId},
    traits::{CatalogSource, DeepEnricher, FieldLookup},
};
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use shared::{
    catalog::CatalogPage, details::ReleaseDetails, fields::Field, identity::ReleaseIdentity,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.discogs.com";

#[derive(Debug, Clone)]
pub struct DiscogsClient {
    base_url: Url,
    token: Option<String>,
    username: String,
    client: Client,
    search_memo: Arc<Mutex<HashMap<ReleaseIdentity, Option<SearchHit>>>>,
}

#[derive(Default)]
pub struct DiscogsClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    username: Option<String>,
    user_agent: Option<String>,
}

impl DiscogsClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn user_agent(mut self, agent: &str) -> Self {
        self.user_agent = Some(agent.to_string());
        self
    }

    pub fn build(self) -> Result<DiscogsClient> {
        let username = self
            .username
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SleeveError::NotConfigured("Discogs username".into()))?;
        let base = self.base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        // A trailing slash keeps any base path when joining endpoints.
        let base_url = Url::parse(&format!("{}/", base.trim_end_matches('/')))?;
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("Sleeve/{}", env!("CARGO_PKG_VERSION")));

        Ok(DiscogsClient {
            base_url,
            token: self.token,
            username,
            client: Client::builder().user_agent(user_agent).build()?,
            search_memo: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}

impl DiscogsClient {
    pub fn username(&self) -> &str {
        &self.username
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.base_url.join(endpoint)?;
        debug!("Request: {} {}", method, url);
        let mut request = self.client.request(method, url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            serde_json::from_str(&text).map_err(|e| {
                SleeveError::Transient(format!("Malformed body ({}): {e}", status.as_u16()))
            })
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            Err(SleeveError::from_status(status.as_u16(), text))
        }
    }

    /// Returns the username the token belongs to.
    pub async fn check_connection(&self) -> Result<String> {
        let identity: Identity = self
            .make_request(Method::GET, "oauth/identity", &[])
            .await?;
        Ok(identity.username)
    }

    pub async fn release(&self, id: &TypedId) -> Result<ReleaseDetails> {
        let endpoint = match id.kind {
            IdKind::Release => format!("releases/{}", id.id),
            IdKind::Master => format!("masters/{}", id.id),
        };
        let detail: ReleaseDetail = self.make_request(Method::GET, &endpoint, &[]).await?;
        Ok(processing::details_from(detail))
    }

    /// Best database match for `identity`, fetched once per identity.
    async fn search(&self, identity: &ReleaseIdentity) -> Result<Option<SearchHit>> {
        if let Some(hit) = self.search_memo.lock().await.get(identity) {
            return Ok(hit.clone());
        }

        info!("Searching Discogs database for {}", identity);
        let query = [
            ("artist", identity.artist.clone()),
            ("release_title", identity.title.clone()),
            ("type", "release".to_string()),
            ("per_page", "5".to_string()),
        ];
        let response: SearchResponse = self
            .make_request(Method::GET, "database/search", &query)
            .await?;
        let hit = response.results.into_iter().next();

        self.search_memo
            .lock()
            .await
            .insert(identity.clone(), hit.clone());
        Ok(hit)
    }
}

#[async_trait]
impl CatalogSource for DiscogsClient {
    fn name(&self) -> &'static str {
        "Discogs"
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<CatalogPage> {
        let endpoint = format!("users/{}/collection/folders/0/releases", self.username);
        let query = [("page", page.to_string()), ("per_page", per_page.to_string())];
        let response: CollectionResponse =
            self.make_request(Method::GET, &endpoint, &query).await?;
        Ok(processing::page_from(response))
    }

    async fn identity(&self) -> Result<String> {
        self.check_connection().await
    }
}

#[async_trait]
impl DeepEnricher for DiscogsClient {
    fn name(&self) -> &'static str {
        "Discogs"
    }

    async fn enrich(&self, id: &TypedId) -> Result<ReleaseDetails> {
        self.release(id).await
    }
}

#[async_trait]
impl FieldLookup for DiscogsClient {
    fn id(&self) -> &'static str {
        DISCOGS_SEARCH
    }

    fn name(&self) -> &'static str {
        "Discogs search"
    }

    fn supports(&self, field: Field) -> bool {
        matches!(
            field,
            Field::Year | Field::Label | Field::Genres | Field::Cover | Field::Discogs
        )
    }

    async fn lookup(&self, entity: &ResolvedEntity, field: Field) -> Result<Option<String>> {
        let Some(hit) = self.search(&entity.identity).await? else {
            return Ok(None);
        };
        Ok(match field {
            Field::Discogs => Some(format!("https://www.discogs.com/release/{}", hit.id)),
            Field::Year => hit.year.clone(),
            Field::Label => hit.label.first().cloned(),
            Field::Genres => processing::hit_genres(&hit),
            Field::Cover => hit.cover_image.clone(),
            _ => None,
        })
    }
}
