use std::{
    sync::Mutex,
    thread,
    time::{
        Duration,
        Instant,
    },
};

use reqwest::{
    blocking::Client,
    Url,
};
use tracing::{
    debug,
    info,
    warn,
};

use super::{
    abc::parse_header,
    html::{
        page_text,
        tune_links,
    },
    TuneLookup,
};
use crate::core::{
    http::{
        get_text,
        http_client,
    },
    LookupError,
    TuneDeckError,
    TuneRecord,
};

const SITE_ROOT: &str = "https://thesession.org/";
const SEARCH_URL: &str = "https://thesession.org/tunes/search";
const DEFINITE_ARTICLE: &str = "The ";

/// Minimum gap between two requests to the tune database.
pub const REQUEST_DELAY: Duration = Duration::from_secs(2);

pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String, LookupError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, TuneDeckError> {
        Ok(Self { client: http_client()? })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, LookupError> {
        get_text(&self.client, url)
    }
}

/// Enforces the request gap. Lookups are sequential, the lock only guards the timestamp.
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    fn wait(&self) {
        let last = self.last_request.lock().map(|last| *last).unwrap_or(None);
        if let Some(last) = last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", remaining);
                thread::sleep(remaining);
            }
        }
    }

    fn mark(&self) {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(Instant::now());
        }
    }
}

/// Resolves tune titles against thesession.org.
///
/// Takes the first search hit without checking that its title matches.
pub struct TheSessionResolver<F: PageFetcher = HttpFetcher> {
    fetcher: F,
    limiter: RateLimiter,
}

impl TheSessionResolver<HttpFetcher> {
    pub fn new() -> Result<Self, TuneDeckError> {
        Ok(Self::with_fetcher(HttpFetcher::new()?))
    }
}

impl<F: PageFetcher> TheSessionResolver<F> {
    pub fn with_fetcher(fetcher: F) -> Self {
        Self { fetcher, limiter: RateLimiter::new(REQUEST_DELAY) }
    }

    #[cfg(test)]
    fn with_delay(fetcher: F, delay: Duration) -> Self {
        Self { fetcher, limiter: RateLimiter::new(delay) }
    }

    /// Every external call goes through here, success or not.
    fn paced_fetch(&self, url: &str) -> Result<String, LookupError> {
        self.limiter.wait();
        let result = self.fetcher.fetch(url);
        self.limiter.mark();
        result
    }

    fn first_result(&self, query: &str) -> Result<Option<String>, LookupError> {
        let url = Url::parse_with_params(SEARCH_URL, &[("type", ""), ("mode", ""), ("q", query)])
            .map_err(|e| LookupError::Network(format!("Invalid search URL: {}", e)))?;

        let html = self.paced_fetch(url.as_str())?;

        let Some(href) = tune_links(&html).into_iter().next() else {
            return Ok(None);
        };

        let tune_url = Url::parse(SITE_ROOT)
            .and_then(|root| root.join(&href))
            .map_err(|e| LookupError::Network(format!("Invalid tune link '{}': {}", href, e)))?;

        Ok(Some(tune_url.to_string()))
    }

    /// URL of the first search hit, retrying once with "The " prepended.
    pub fn search(&self, title: &str) -> Result<String, LookupError> {
        if let Some(url) = self.first_result(title)? {
            return Ok(url);
        }

        if !title.to_lowercase().starts_with(&DEFINITE_ARTICLE.to_lowercase()) {
            let with_article = format!("{}{}", DEFINITE_ARTICLE, title);
            info!("No results for '{}', trying '{}'", title, with_article);
            if let Some(url) = self.first_result(&with_article)? {
                return Ok(url);
            }
        }

        Err(LookupError::NotFound(title.to_string()))
    }

    /// Reads title, rhythm and key from a tune page.
    pub fn fetch_record(&self, tune_url: &str) -> Result<TuneRecord, LookupError> {
        let html = self.paced_fetch(tune_url)?;
        let text = page_text(&html);

        let header = parse_header(&text).unwrap_or_default();
        match (header.title, header.rhythm, header.key) {
            (Some(title), Some(rhythm), Some(key)) => {
                Ok(TuneRecord { title, rhythm, key, source_url: tune_url.to_string() })
            }
            (title, rhythm, key) => {
                warn!("Incomplete metadata at {} (T:{:?}, R:{:?}, K:{:?})", tune_url, title, rhythm, key);
                Err(LookupError::ParseIncomplete { url: tune_url.to_string(), title, rhythm, key })
            }
        }
    }

    pub fn resolve(&self, title: &str) -> Result<TuneRecord, LookupError> {
        let tune_url = self.search(title)?;
        info!("Found: {}", tune_url);
        self.fetch_record(&tune_url)
    }
}

impl<F: PageFetcher> TuneLookup for TheSessionResolver<F> {
    fn lookup(&self, title: &str) -> Result<TuneRecord, LookupError> {
        self.resolve(title)
    }
}
