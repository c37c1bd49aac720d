// src/linkedin_analysis/browser_source.rs
use super::browser_session::{login, wait_for, BrowserPage, BrowserSession, POLL_INTERVAL};
use super::JobSource;
use crate::config::{BrowserSettings, Credentials, SettleStrategy};
use crate::error::PipelineError;
use crate::types::{JobSearch, RawDescription, RawJobRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub const JOB_SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";

pub(crate) const JOB_CARDS: &str = ".job-card-container, .jobs-search-results__list-item";
const CARD_TITLE: &[&str] = &[".job-card-container__link, h3.job-card-list__title"];
const CARD_COMPANY: &[&str] = &[".job-card-container__company-name"];
pub(crate) const DETAIL_DESCRIPTION: &[&str] = &[
    "div.jobs-box__html-content[id=\"job-details\"]",
    ".jobs-description__container",
    ".jobs-description-content__text",
];

pub fn search_url(search: &JobSearch) -> Result<Url> {
    Url::parse_with_params(
        JOB_SEARCH_URL,
        &[
            ("keywords", search.query.as_str()),
            ("location", search.location.as_str()),
        ],
    )
    .context("Failed to build job search URL")
}

/// Scrapes the rendered search results by clicking through the result cards.
pub struct BrowserJobScraper<'a> {
    settings: &'a BrowserSettings,
}

impl<'a> BrowserJobScraper<'a> {
    pub fn new(settings: &'a BrowserSettings) -> Self {
        Self { settings }
    }

    pub async fn scrape<P: BrowserPage + ?Sized>(
        &self,
        page: &P,
        search: &JobSearch,
    ) -> Result<Vec<RawJobRecord>, PipelineError> {
        info!(
            "Fetching job listings for {} in {}",
            search.query, search.location
        );
        let url = search_url(search).map_err(PipelineError::acquisition)?;
        page.navigate(url.as_str())
            .await
            .map_err(PipelineError::acquisition)?;

        self.settle(page, JOB_CARDS, self.settings.search_settle())
            .await;

        let found = page
            .count(JOB_CARDS)
            .await
            .map_err(PipelineError::acquisition)?;
        let considered = found.min(search.limit);
        info!("Found {} job listings, processing {}", found, considered);

        let mut jobs = Vec::with_capacity(considered);
        for index in 0..considered {
            debug!("Processing job {}/{}", index + 1, considered);
            match self.read_card(page, index).await {
                Ok(Some(job)) => {
                    info!(
                        "Added: {} at {}",
                        job.title.as_deref().unwrap_or_default(),
                        job.company.as_deref().unwrap_or_default()
                    );
                    jobs.push(job);
                }
                Ok(None) => info!("Skipping job {}: no description", index + 1),
                Err(e) => warn!("Skipping job {}: {:#}", index + 1, e),
            }
        }

        Ok(jobs)
    }

    async fn read_card<P: BrowserPage + ?Sized>(
        &self,
        page: &P,
        index: usize,
    ) -> Result<Option<RawJobRecord>> {
        match self.settings.settle_strategy {
            SettleStrategy::Fixed => {
                page.click_nth(JOB_CARDS, index).await?;
                sleep(self.settings.detail_settle()).await;
            }
            SettleStrategy::Poll => {
                // the pane still shows the previous card until the click lands
                let previous = current_description(page).await;
                page.click_nth(JOB_CARDS, index).await?;
                let interval = self.settings.detail_settle();
                if !wait_for_new_description(page, previous.as_deref(), interval).await {
                    debug!("Detail pane for job {} unchanged after {:?}", index + 1, interval);
                }
            }
        }

        let card_html = page.nth_html(JOB_CARDS, index).await?;
        let page_html = page.html().await?;

        Ok(parse_job(&card_html, &page_html))
    }

    async fn settle<P: BrowserPage + ?Sized>(&self, page: &P, selector: &str, interval: Duration) {
        match self.settings.settle_strategy {
            SettleStrategy::Fixed => sleep(interval).await,
            SettleStrategy::Poll => {
                if !wait_for(page, selector, interval).await {
                    debug!("{} not ready after {:?}", selector, interval);
                }
            }
        }
    }
}

async fn current_description<P: BrowserPage + ?Sized>(page: &P) -> Option<String> {
    let html = page.html().await.ok()?;
    description_text(&html)
}

/// Poll until the detail pane shows a description other than `previous`.
async fn wait_for_new_description<P: BrowserPage + ?Sized>(
    page: &P,
    previous: Option<&str>,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(current) = current_description(page).await {
            if previous != Some(current.as_str()) {
                return true;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

fn description_text(page_html: &str) -> Option<String> {
    let page = Html::parse_document(page_html);
    find_text_by_selectors(&page, DETAIL_DESCRIPTION, clean_block_text)
}

/// Build a record from a result card and the page showing its detail pane.
/// Returns `None` when the detail pane has no description text.
pub fn parse_job(card_html: &str, page_html: &str) -> Option<RawJobRecord> {
    let description = description_text(page_html)?;
    let card = Html::parse_fragment(card_html);

    Some(RawJobRecord {
        title: find_text_by_selectors(&card, CARD_TITLE, clean_text),
        company: find_text_by_selectors(&card, CARD_COMPANY, clean_text),
        description: Some(RawDescription::Text(description)),
    })
}

fn find_text_by_selectors(
    document: &Html,
    selectors: &[&str],
    clean: fn(&str) -> String,
) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = clean(&element_text(element));
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

/// Collapse all whitespace into single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Like `clean_text` but keeps line structure, dropping blank lines.
fn clean_block_text(text: &str) -> String {
    text.lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct BrowserJobSource {
    settings: BrowserSettings,
    session: Option<BrowserSession>,
}

impl BrowserJobSource {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            session: None,
        }
    }
}

#[async_trait]
impl JobSource for BrowserJobSource {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn authenticate(&mut self, credentials: Credentials) -> Result<(), PipelineError> {
        let session = BrowserSession::launch(&self.settings)
            .await
            .map_err(PipelineError::authentication)?;

        // keep the session even if login fails so release() still closes Chromium
        let result = login(&session, &credentials, &self.settings).await;
        self.session = Some(session);
        result
    }

    async fn acquire(&mut self, search: &JobSearch) -> Result<Vec<RawJobRecord>, PipelineError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| PipelineError::Acquisition("browser session not started".to_string()))?;

        BrowserJobScraper::new(&self.settings)
            .scrape(session, search)
            .await
    }

    async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Card {
        html: String,
        detail: String,
        broken: bool,
    }

    /// Search results page where clicking card `i` swaps in card `i`'s detail pane.
    struct ResultsPage {
        cards: Vec<Card>,
        selected: Mutex<Option<usize>>,
        visited: Mutex<Vec<String>>,
    }

    impl ResultsPage {
        fn new(cards: Vec<Card>) -> Self {
            Self {
                cards,
                selected: Mutex::new(None),
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    fn card(title: &str, company: &str, description: &str) -> Card {
        Card {
            html: format!(
                r#"<li class="jobs-search-results__list-item"><div class="job-card-container"><a class="job-card-container__link">
                    {}
                </a><span class="job-card-container__company-name"> {} </span></div></li>"#,
                title, company
            ),
            detail: format!(
                r#"<html><body><div class="jobs-box__html-content" id="job-details">{}</div></body></html>"#,
                description
            ),
            broken: false,
        }
    }

    #[async_trait]
    impl BrowserPage for ResultsPage {
        async fn navigate(&self, url: &str) -> Result<()> {
            self.visited.lock().unwrap().push(url.to_string());
            Ok(())
        }
        async fn fill(&self, _selector: &str, _text: &str) -> Result<()> {
            Ok(())
        }
        async fn click(&self, _selector: &str) -> Result<()> {
            Ok(())
        }
        async fn exists(&self, _selector: &str) -> Result<bool> {
            Ok(true)
        }
        async fn count(&self, selector: &str) -> Result<usize> {
            assert_eq!(selector, JOB_CARDS);
            Ok(self.cards.len())
        }
        async fn click_nth(&self, _selector: &str, index: usize) -> Result<()> {
            if self.cards[index].broken {
                anyhow::bail!("element is detached from the DOM");
            }
            *self.selected.lock().unwrap() = Some(index);
            Ok(())
        }
        async fn nth_html(&self, _selector: &str, index: usize) -> Result<String> {
            Ok(self.cards[index].html.clone())
        }
        async fn html(&self) -> Result<String> {
            let selected = *self.selected.lock().unwrap();
            Ok(selected
                .map(|i| self.cards[i].detail.clone())
                .unwrap_or_default())
        }
    }

    /// Detail pane that keeps showing the previous card for a few reads after each click.
    struct LaggingPage {
        cards: Vec<Card>,
        lag: usize,
        selected: Mutex<Option<usize>>,
        shown: Mutex<Option<usize>>,
        stale_reads: Mutex<usize>,
    }

    impl LaggingPage {
        fn new(cards: Vec<Card>, lag: usize) -> Self {
            Self {
                cards,
                lag,
                selected: Mutex::new(None),
                shown: Mutex::new(None),
                stale_reads: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl BrowserPage for LaggingPage {
        async fn navigate(&self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn fill(&self, _selector: &str, _text: &str) -> Result<()> {
            Ok(())
        }
        async fn click(&self, _selector: &str) -> Result<()> {
            Ok(())
        }
        async fn exists(&self, _selector: &str) -> Result<bool> {
            Ok(true)
        }
        async fn count(&self, _selector: &str) -> Result<usize> {
            Ok(self.cards.len())
        }
        async fn click_nth(&self, _selector: &str, index: usize) -> Result<()> {
            *self.selected.lock().unwrap() = Some(index);
            *self.stale_reads.lock().unwrap() = self.lag;
            Ok(())
        }
        async fn nth_html(&self, _selector: &str, index: usize) -> Result<String> {
            Ok(self.cards[index].html.clone())
        }
        async fn html(&self) -> Result<String> {
            let mut stale = self.stale_reads.lock().unwrap();
            let mut shown = self.shown.lock().unwrap();
            if *stale > 0 {
                *stale -= 1;
            } else {
                *shown = *self.selected.lock().unwrap();
            }
            Ok(shown.map(|i| self.cards[i].detail.clone()).unwrap_or_default())
        }
    }

    fn instant_settings() -> BrowserSettings {
        BrowserSettings {
            search_settle_secs: 0,
            detail_settle_secs: 0,
            ..BrowserSettings::default()
        }
    }

    #[test]
    fn test_search_url_encodes_query() {
        let url = search_url(&JobSearch::new("Software Engineer", "Singapore", 10)).unwrap();
        assert_eq!(url.path(), "/jobs/search/");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("keywords".to_string(), "Software Engineer".to_string()),
                ("location".to_string(), "Singapore".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_job_reads_card_and_detail() {
        let c = card("Backend Engineer", "Acme Pte Ltd", "<p>Rust</p>\n<p>  SQL  and Kafka </p>");
        let job = parse_job(&c.html, &c.detail).unwrap();
        assert_eq!(job.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(job.company.as_deref(), Some("Acme Pte Ltd"));
        assert_eq!(
            job.description,
            Some(RawDescription::Text("Rust\nSQL and Kafka".to_string()))
        );
    }

    #[test]
    fn test_parse_job_without_description_is_none() {
        let c = card("Backend Engineer", "Acme", "   ");
        assert!(parse_job(&c.html, &c.detail).is_none());
        assert!(parse_job(&c.html, "<html><body><main>nothing</main></body></html>").is_none());
    }

    #[test]
    fn test_parse_job_falls_back_to_secondary_description_selector() {
        let c = card("SRE", "Acme", "");
        let page = r#"<div class="jobs-description__container">On-call rotation</div>"#;
        let job = parse_job(&c.html, page).unwrap();
        assert_eq!(
            job.description,
            Some(RawDescription::Text("On-call rotation".to_string()))
        );
    }

    #[tokio::test]
    async fn test_scrape_caps_at_limit() {
        let page = ResultsPage::new(
            (0..5)
                .map(|i| card(&format!("Job {}", i), "Acme", "Rust"))
                .collect(),
        );
        let settings = instant_settings();

        let jobs = BrowserJobScraper::new(&settings)
            .scrape(&page, &JobSearch::new("Software Engineer", "Singapore", 2))
            .await
            .unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].title.as_deref(), Some("Job 1"));
        assert!(page.visited.lock().unwrap()[0].starts_with(JOB_SEARCH_URL));
    }

    #[tokio::test]
    async fn test_scrape_skips_empty_and_broken_cards() {
        let mut broken = card("Broken", "Acme", "Rust");
        broken.broken = true;
        let page = ResultsPage::new(vec![
            card("First", "Acme", "Go"),
            card("Empty", "Acme", "  "),
            broken,
            card("Last", "Initech", "Python"),
        ]);
        let settings = instant_settings();

        let jobs = BrowserJobScraper::new(&settings)
            .scrape(&page, &JobSearch::new("Software Engineer", "Singapore", 10))
            .await
            .unwrap();

        let titles: Vec<_> = jobs.iter().map(|j| j.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["First", "Last"]);
        assert_eq!(
            jobs[1].description,
            Some(RawDescription::Text("Python".to_string()))
        );
    }

    #[tokio::test]
    async fn test_scrape_with_poll_strategy() {
        let page = ResultsPage::new(vec![card("Only", "Acme", "Rust")]);
        let settings = BrowserSettings {
            settle_strategy: SettleStrategy::Poll,
            ..instant_settings()
        };

        let jobs = BrowserJobScraper::new(&settings)
            .scrape(&page, &JobSearch::new("Software Engineer", "Singapore", 10))
            .await
            .unwrap();

        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_strategy_waits_for_detail_pane_to_change() {
        let page = LaggingPage::new(
            vec![
                card("Alpha Job", "Acme", "alpha description"),
                card("Beta Job", "Initech", "beta description"),
                card("Gamma Job", "Hooli", "gamma description"),
            ],
            2,
        );
        let settings = BrowserSettings {
            search_settle_secs: 0,
            detail_settle_secs: 2,
            settle_strategy: SettleStrategy::Poll,
            ..BrowserSettings::default()
        };

        let jobs = BrowserJobScraper::new(&settings)
            .scrape(&page, &JobSearch::new("Software Engineer", "Singapore", 10))
            .await
            .unwrap();

        let pairs: Vec<_> = jobs
            .iter()
            .map(|j| (j.title.clone().unwrap(), j.description.clone().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Alpha Job".to_string(), RawDescription::Text("alpha description".to_string())),
                ("Beta Job".to_string(), RawDescription::Text("beta description".to_string())),
                ("Gamma Job".to_string(), RawDescription::Text("gamma description".to_string())),
            ]
        );
    }
}
