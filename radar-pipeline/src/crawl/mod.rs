//! Crawl engine
//!
//! Walks the configured listing categories page by page and turns the
//! embedded posts into raw job candidates. A category stops at the first post
//! older than the age window, so later pages are never requested. Candidate
//! ids are deduplicated across the whole run, first seen wins.

mod page;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use radar_core::domain::tags::flag_all;
use radar_core::dto::raw_job::NewRawJob;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::error::CrawlError;
use page::ListingPost;

/// Source of raw job candidates
#[async_trait]
pub trait JobFetcher: Send + Sync {
    /// Crawls every category once
    ///
    /// Any transport or page-level failure aborts the whole crawl.
    async fn fetch(&self) -> Result<Vec<NewRawJob>, CrawlError>;
}

/// Clock used for the age cutoff
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Crawler for listing sites that embed their posts in `__NEXT_DATA__`
pub struct ListingCrawler {
    base: Url,
    base_url: String,
    source: String,
    categories: Vec<String>,
    markers: Vec<String>,
    max_pages: i64,
    max_age_days: i64,
    client: Client,
    clock: Clock,
}

impl ListingCrawler {
    /// Creates a crawler with its own HTTP client
    pub fn new(config: &CrawlConfig) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(CrawlError::Client)?;
        Self::with_client(config, client)
    }

    /// Creates a crawler that sends its requests through `client`
    pub fn with_client(config: &CrawlConfig, client: Client) -> Result<Self, CrawlError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|source| CrawlError::InvalidUrl {
            url: base_url.clone(),
            source,
        })?;

        Ok(Self {
            base,
            base_url,
            source: config.source.clone(),
            categories: config.category_paths(),
            markers: config.remote_markers(),
            max_pages: config.max_pages(),
            max_age_days: config.max_age_days(),
            client,
            clock: Arc::new(Utc::now),
        })
    }

    /// Replaces the wall clock
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn cutoff(&self) -> DateTime<Utc> {
        let window = TimeDelta::try_days(self.max_age_days).unwrap_or(TimeDelta::MAX);
        (self.clock)()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Builds the URL of a category page; page 1 carries no page parameter
    fn page_url(&self, category: &str, page: i64) -> Result<Url, CrawlError> {
        let path = if page <= 1 {
            category.to_string()
        } else if category.contains('?') {
            format!("{}&page={}", category, page)
        } else {
            format!("{}?page={}", category, page)
        };

        self.base.join(&path).map_err(|source| CrawlError::InvalidUrl { url: path, source })
    }

    /// Makes a post URL absolute
    fn absolute_url(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return self.base_url.clone();
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return raw.to_string();
        }
        match self.base.join(raw) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.base_url, raw),
        }
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| CrawlError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| CrawlError::Body {
            url: url.to_string(),
            source,
        })
    }

    fn build_candidate(
        &self,
        post: &ListingPost,
        external_id: String,
        published_at: DateTime<Utc>,
        raw_payload: serde_json::Value,
    ) -> NewRawJob {
        let url = match post.url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => url.to_string(),
            None if !external_id.is_empty() => format!("/posts/{}", external_id),
            None => String::new(),
        };

        NewRawJob {
            source: self.source.clone(),
            title: post.display_title(),
            summary: post.display_summary(),
            content: String::new(),
            url: self.absolute_url(&url),
            tags: flag_all(post.tag_names()),
            raw_payload,
            published_at,
            external_id,
        }
    }
}

#[async_trait]
impl JobFetcher for ListingCrawler {
    async fn fetch(&self) -> Result<Vec<NewRawJob>, CrawlError> {
        let cutoff = self.cutoff();
        let mut jobs = Vec::new();
        let mut seen = HashSet::new();

        info!(
            "Starting crawl: base={} categories={} max_pages={} cutoff={}",
            self.base_url,
            self.categories.join(","),
            self.max_pages,
            cutoff.to_rfc3339()
        );

        for category in &self.categories {
            let mut reached_cutoff = false;

            for page in 1..=self.max_pages {
                let url = self.page_url(category, page)?;
                debug!("Fetching category={} page={} url={}", category, page, url);

                let html = self.fetch_page(&url).await?;
                let posts = page::extract_posts(url.as_str(), &html)?;
                let parsed = posts.len();
                let mut accepted = 0;

                for raw_post in posts {
                    let post = match ListingPost::deserialize(&raw_post) {
                        Ok(post) => post,
                        Err(e) => {
                            warn!("Skipping undecodable post on {}: {}", url, e);
                            continue;
                        }
                    };

                    let Some(published_at) = post.published() else {
                        warn!(
                            "Skipping post {} without a valid publish time ({:?})",
                            post.external_id(),
                            post.published_text()
                        );
                        continue;
                    };

                    if published_at < cutoff {
                        info!(
                            "Reached cutoff: category={} page={} job_id={} published_at={}",
                            category,
                            page,
                            post.external_id(),
                            published_at.to_rfc3339()
                        );
                        reached_cutoff = true;
                        break;
                    }

                    if !post.is_remote(&self.markers) {
                        continue;
                    }

                    let external_id = post.external_id();
                    if !external_id.is_empty() && !seen.insert(external_id.clone()) {
                        debug!(
                            "Skipping duplicate: category={} page={} job_id={}",
                            category, page, external_id
                        );
                        continue;
                    }

                    jobs.push(self.build_candidate(&post, external_id, published_at, raw_post));
                    accepted += 1;
                }

                info!(
                    "Crawled category={} page={} parsed={} accepted={} total={}",
                    category,
                    page,
                    parsed,
                    accepted,
                    jobs.len()
                );

                if reached_cutoff {
                    break;
                }
            }
        }

        info!("Crawl finished with {} candidate(s)", jobs.len());

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        extract::State,
        http::{StatusCode, Uri},
        response::{Html, IntoResponse, Response},
    };
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Site {
        pages: Arc<HashMap<String, String>>,
        hits: Arc<Mutex<Vec<String>>>,
    }

    async fn serve_page(State(site): State<Site>, uri: Uri) -> Response {
        let key = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();
        site.hits.lock().unwrap().push(key.clone());
        match site.pages.get(&key) {
            Some(body) => Html(body.clone()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn spawn_site(pages: &[(&str, String)]) -> (String, Site) {
        let site = Site {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(path, body)| (path.to_string(), body.clone()))
                    .collect(),
            ),
            hits: Arc::default(),
        };
        let router = Router::new().fallback(serve_page).with_state(site.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{}", addr), site)
    }

    fn listing(posts: Vec<Value>) -> String {
        let data = json!({"props": {"pageProps": {"postList": {"posts": posts}}}});
        format!(
            r#"<html><body><script id="__NEXT_DATA__" type="application/json">{}</script></body></html>"#,
            data
        )
    }

    fn post(id: Value, title: &str, published_at: DateTime<Utc>, tags: &[&str]) -> Value {
        let tags: Vec<Value> = tags.iter().map(|name| json!({ "name": name })).collect();
        json!({
            "id": id,
            "title": title,
            "summary": format!("{} summary", title),
            "publishedAt": published_at.to_rfc3339(),
            "tags": tags,
        })
    }

    fn now() -> DateTime<Utc> {
        "2024-06-10T00:00:00Z".parse().unwrap()
    }

    fn crawler(base: &str, categories: &[&str], max_pages: i64) -> ListingCrawler {
        let config = CrawlConfig {
            base_url: base.to_string(),
            category_paths: categories.iter().map(|c| c.to_string()).collect(),
            max_pages,
            max_age_days: 30,
            ..Default::default()
        };
        ListingCrawler::new(&config).unwrap().with_clock(now)
    }

    #[tokio::test]
    async fn test_fetch_filters_by_tag_and_age() {
        let recent = now() - TimeDelta::days(1);
        let old = now() - TimeDelta::days(45);
        let (base, site) = spawn_site(&[
            (
                "/categories/5?sort=new",
                listing(vec![
                    post(json!("101"), "Remote Backend", recent, &["远程工作"]),
                    post(json!("102"), "Onsite QA", recent, &["全职"]),
                    post(json!("103"), "Old Remote", old, &["远程工作"]),
                    post(json!("104"), "After Cutoff", recent, &["远程工作"]),
                ]),
            ),
            ("/categories/5?sort=new&page=2", listing(Vec::new())),
        ])
        .await;

        let jobs = crawler(&base, &["/categories/5?sort=new"], 3)
            .fetch()
            .await
            .unwrap();

        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.external_id, "101");
        assert_eq!(job.source, "eleduck");
        assert_eq!(job.title, "Remote Backend");
        assert_eq!(job.url, format!("{}/posts/101", base));
        assert_eq!(job.tags.get("远程工作"), Some(&json!(true)));
        assert_eq!(job.raw_payload["title"], "Remote Backend");

        // Paging stops at the cutoff, page 2 is never requested
        assert_eq!(*site.hits.lock().unwrap(), vec!["/categories/5?sort=new"]);
    }

    #[tokio::test]
    async fn test_fetch_follows_pages_until_max() {
        let recent = now() - TimeDelta::hours(2);
        let (base, site) = spawn_site(&[
            (
                "/jobs",
                listing(vec![post(json!(1), "First", recent, &["remote"])]),
            ),
            (
                "/jobs?page=2",
                listing(vec![post(json!(2), "Second", recent, &["remote"])]),
            ),
        ])
        .await;

        let jobs = crawler(&base, &["/jobs"], 2).fetch().await.unwrap();

        let ids: Vec<_> = jobs.iter().map(|j| j.external_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(site.hits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_ids_first_seen_wins() {
        let recent = now() - TimeDelta::hours(1);
        let (base, _site) = spawn_site(&[
            (
                "/a",
                listing(vec![post(json!("201"), "From A", recent, &["远程"])]),
            ),
            (
                "/b",
                listing(vec![
                    post(json!("201"), "From B", recent, &["远程"]),
                    post(json!("202"), "Only B", recent, &["远程"]),
                ]),
            ),
        ])
        .await;

        let jobs = crawler(&base, &["/a", "/b"], 1).fetch().await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].external_id, "201");
        assert_eq!(jobs[0].title, "From A");
        assert_eq!(jobs[1].external_id, "202");
    }

    #[tokio::test]
    async fn test_bad_posts_are_skipped() {
        let recent = now() - TimeDelta::hours(1);
        let (base, _site) = spawn_site(&[(
            "/jobs",
            listing(vec![
                json!({"id": 1, "title": "No date", "tags": [{"name": "remote"}]}),
                json!({"id": 2, "title": "Bad date", "publishedAt": "yesterday", "tags": [{"name": "remote"}]}),
                json!({"id": 3, "title": 17, "publishedAt": recent.to_rfc3339(), "tags": [{"name": "remote"}]}),
                post(json!(4), "Good", recent, &["remote"]),
            ]),
        )])
        .await;

        let jobs = crawler(&base, &["/jobs"], 1).fetch().await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].external_id, "4");
    }

    #[tokio::test]
    async fn test_nested_shape_and_fallbacks() {
        let recent = now() - TimeDelta::hours(1);
        let data = json!({"props": {"initialProps": {"pageProps": {"postList": {"posts": [
            {
                "id": 301.0,
                "full_title": "Full Title",
                "excerpt": "Short excerpt",
                "published_at": recent.to_rfc3339(),
                "tags": [{"name": "远程"}],
                "url": "https://elsewhere.example/jobs/301"
            },
            {
                "id": null,
                "title": "Anonymous",
                "publishedAt": recent.to_rfc3339(),
                "tags": [{"name": "远程"}]
            }
        ]}}}}});
        let html = format!(r#"<script id="__NEXT_DATA__">{}</script>"#, data);
        let (base, _site) = spawn_site(&[("/jobs", html)]).await;

        let jobs = crawler(&base, &["/jobs"], 1).fetch().await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].external_id, "301");
        assert_eq!(jobs[0].title, "Full Title");
        assert_eq!(jobs[0].summary, "Short excerpt");
        assert_eq!(jobs[0].url, "https://elsewhere.example/jobs/301");
        assert_eq!(jobs[1].external_id, "");
        assert_eq!(jobs[1].summary, "Anonymous");
        assert_eq!(jobs[1].url, base);
    }

    #[tokio::test]
    async fn test_page_errors_abort_the_crawl() {
        let recent = now() - TimeDelta::hours(1);
        let (base, _site) = spawn_site(&[
            (
                "/ok",
                listing(vec![post(json!(1), "Fine", recent, &["remote"])]),
            ),
            ("/broken", "<html><body>maintenance</body></html>".to_string()),
        ])
        .await;

        let err = crawler(&base, &["/ok", "/broken"], 1)
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::MissingScript { .. }));

        let err = crawler(&base, &["/missing"], 1).fetch().await.unwrap_err();
        assert!(matches!(err, CrawlError::Status { status: 404, .. }));
    }

    #[test]
    fn test_page_url() {
        let crawler = crawler("https://eleduck.com/", &["/categories/5"], 2);
        assert_eq!(
            crawler.page_url("/categories/5?sort=new", 1).unwrap().as_str(),
            "https://eleduck.com/categories/5?sort=new"
        );
        assert_eq!(
            crawler.page_url("/categories/5?sort=new", 2).unwrap().as_str(),
            "https://eleduck.com/categories/5?sort=new&page=2"
        );
        assert_eq!(
            crawler.page_url("/categories/5", 3).unwrap().as_str(),
            "https://eleduck.com/categories/5?page=3"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = CrawlConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ListingCrawler::new(&config),
            Err(CrawlError::InvalidUrl { .. })
        ));
    }
}
