use std::sync::Mutex;
use url::Url;

/// The browser-side effects of the authorization flow
pub trait Browser: Send + Sync {
    /// Send the user agent to `url`
    fn navigate(&self, url: &Url);

    /// Drop every cookie visible to the application
    fn clear_cookies(&self);
}

/// Records requested effects instead of performing them.
///
/// Embedding applications read [`take_navigation`](Self::take_navigation)
/// after a flow operation and act on it (open a browser, answer with a
/// redirect, ...).
#[derive(Default)]
pub struct RecordingBrowser {
    navigation: Mutex<Option<Url>>,
    cookies_cleared: Mutex<bool>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last requested navigation, leaving it in place
    pub fn last_navigation(&self) -> Option<Url> {
        self.navigation.lock().ok().and_then(|n| n.clone())
    }

    /// Last requested navigation, consuming it
    pub fn take_navigation(&self) -> Option<Url> {
        self.navigation.lock().ok().and_then(|mut n| n.take())
    }

    pub fn cookies_cleared(&self) -> bool {
        self.cookies_cleared.lock().map(|c| *c).unwrap_or(false)
    }
}

impl Browser for RecordingBrowser {
    fn navigate(&self, url: &Url) {
        if let Ok(mut navigation) = self.navigation.lock() {
            *navigation = Some(url.clone());
        }
    }

    fn clear_cookies(&self) {
        if let Ok(mut cleared) = self.cookies_cleared.lock() {
            *cleared = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_navigation() {
        let browser = RecordingBrowser::new();
        assert!(browser.last_navigation().is_none());

        let url = Url::parse("http://oidc.com/login?state=abc").unwrap();
        browser.navigate(&url);

        assert_eq!(browser.last_navigation(), Some(url.clone()));
        assert_eq!(browser.take_navigation(), Some(url));
        assert!(browser.take_navigation().is_none());
    }

    #[test]
    fn test_records_cookie_clearing() {
        let browser = RecordingBrowser::new();
        assert!(!browser.cookies_cleared());

        browser.clear_cookies();
        assert!(browser.cookies_cleared());
    }
}
