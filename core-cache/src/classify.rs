//! Request classification and cache keys.

use url::Url;

/// How a fetch is served once the worker is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Network first, any cached copy as fallback.
    AudioStream,
    /// Cache first, network on miss.
    StaticAsset,
}

#[derive(Debug, Clone)]
pub struct RequestClassifier {
    origin: Url,
    audio_extensions: Vec<String>,
}

impl RequestClassifier {
    pub fn new(origin: Url, audio_extensions: &[String]) -> Self {
        Self {
            origin,
            audio_extensions: audio_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Resolve `raw` against the worker origin. Absolute URLs are kept as is.
    pub fn resolve(&self, raw: &str) -> Option<Url> {
        self.origin.join(raw).ok()
    }

    /// Classify by the extension of the URL path. Query string and fragment
    /// never count.
    pub fn classify(&self, raw: &str) -> RequestClass {
        let path = match self.resolve(raw) {
            Some(url) => url.path().to_string(),
            None => raw.split(['?', '#']).next().unwrap_or_default().to_string(),
        };

        let extension = path
            .rsplit('/')
            .next()
            .and_then(|segment| segment.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension {
            Some(ext) if self.audio_extensions.contains(&ext) => RequestClass::AudioStream,
            _ => RequestClass::StaticAsset,
        }
    }

    /// Whether `raw` points at the worker's own origin. Relative URLs always do.
    pub fn is_same_origin(&self, raw: &str) -> bool {
        self.resolve(raw)
            .map(|url| url.origin() == self.origin.origin())
            .unwrap_or(false)
    }

    /// Key under which a response for `raw` is stored: the absolute URL
    /// without fragment.
    pub fn cache_key(&self, raw: &str) -> String {
        match self.resolve(raw) {
            Some(mut url) => {
                url.set_fragment(None);
                url.to_string()
            }
            None => raw.to_string(),
        }
    }
}
