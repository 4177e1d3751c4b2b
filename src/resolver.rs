use tracing::{debug, info, warn};

use crate::models::{LyricResult, TrackQuery};
use crate::providers::LyricsProvider;

struct ProviderEntry {
    provider: Box<dyn LyricsProvider>,
    enabled: bool,
    priority: i32,
}

/// Tries providers in ascending priority and returns the first result.
///
/// A provider fault is logged and skipped; it never ends the resolution.
#[derive(Default)]
pub struct LyricsResolver {
    entries: Vec<ProviderEntry>,
}

impl LyricsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equal priorities keep insertion order.
    pub fn add(&mut self, provider: Box<dyn LyricsProvider>, enabled: bool, priority: i32) {
        self.entries.push(ProviderEntry {
            provider,
            enabled,
            priority,
        });
        self.entries.sort_by_key(|e| e.priority);
    }

    /// Enabled providers in the order they will be tried.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.provider.name())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        !self.entries.iter().any(|e| e.enabled)
    }

    pub fn resolve(
        &mut self,
        artist: &str,
        title: &str,
        album: Option<&str>,
        duration_secs: Option<f64>,
    ) -> Option<LyricResult> {
        let query = TrackQuery::new(artist, title)
            .with_album(album.map(str::to_string))
            .with_duration(duration_secs);
        self.resolve_query(&query)
    }

    pub fn resolve_query(&mut self, query: &TrackQuery) -> Option<LyricResult> {
        for entry in self.entries.iter_mut().filter(|e| e.enabled) {
            let name = entry.provider.name();
            debug!(provider = name, artist = %query.artist, title = %query.title, "trying provider");

            match entry.provider.get_lyrics(query) {
                Ok(Some(result)) => {
                    info!(
                        provider = name,
                        lines = result.lines.len(),
                        instrumental = result.is_instrumental,
                        word_synced = result.word_synced.is_some(),
                        "lyrics found"
                    );
                    return Some(result);
                }
                Ok(None) => debug!(provider = name, "no lyrics"),
                Err(e) => warn!(provider = name, error = %format!("{e:#}"), "provider failed"),
            }
        }

        info!(artist = %query.artist, title = %query.title, "no provider had synced lyrics");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LyricLine;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Reply {
        Nothing,
        Found(LyricResult),
        Fault,
    }

    struct StubProvider {
        name: &'static str,
        reply: Reply,
        calls: Arc<AtomicUsize>,
    }

    impl LyricsProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn get_lyrics(&mut self, _query: &TrackQuery) -> anyhow::Result<Option<LyricResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Nothing => Ok(None),
                Reply::Found(result) => Ok(Some(result.clone())),
                Reply::Fault => Err(anyhow!("connection reset")),
            }
        }
    }

    fn stub(name: &'static str, reply: Reply) -> (Box<dyn LyricsProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = StubProvider {
            name,
            reply,
            calls: Arc::clone(&calls),
        };
        (Box::new(provider), calls)
    }

    fn result(text: &str) -> LyricResult {
        LyricResult::synced(vec![LyricLine::new(1.0, text)]).unwrap()
    }

    #[test]
    fn test_first_success_wins() {
        let mut resolver = LyricsResolver::new();
        let (a, a_calls) = stub("a", Reply::Nothing);
        let (b, b_calls) = stub("b", Reply::Found(result("from b")));
        let (c, c_calls) = stub("c", Reply::Found(result("from c")));
        resolver.add(a, true, 1);
        resolver.add(b, true, 2);
        resolver.add(c, true, 3);

        let found = resolver.resolve("Artist", "Title", None, None).unwrap();
        assert_eq!(found.lines[0].text, "from b");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fault_does_not_abort() {
        let mut resolver = LyricsResolver::new();
        let (a, _) = stub("a", Reply::Fault);
        let (b, _) = stub("b", Reply::Found(result("recovered")));
        resolver.add(a, true, 1);
        resolver.add(b, true, 2);

        let found = resolver.resolve("Artist", "Title", Some("Album"), Some(200.0));
        assert_eq!(found.unwrap().lines[0].text, "recovered");
    }

    #[test]
    fn test_all_fail_is_none() {
        let mut resolver = LyricsResolver::new();
        let (a, _) = stub("a", Reply::Fault);
        let (b, _) = stub("b", Reply::Nothing);
        resolver.add(a, true, 1);
        resolver.add(b, true, 2);
        assert!(resolver.resolve("Artist", "Title", None, None).is_none());

        assert!(LyricsResolver::new()
            .resolve("Artist", "Title", None, None)
            .is_none());
    }

    #[test]
    fn test_priority_order_and_disabled() {
        let mut resolver = LyricsResolver::new();
        let (late, late_calls) = stub("late", Reply::Found(result("late")));
        let (off, off_calls) = stub("off", Reply::Found(result("off")));
        let (early, _) = stub("early", Reply::Nothing);
        let (tied, _) = stub("tied", Reply::Nothing);
        resolver.add(late, true, 5);
        resolver.add(off, false, 0);
        resolver.add(early, true, 1);
        resolver.add(tied, true, 1);

        assert_eq!(resolver.provider_names(), vec!["early", "tied", "late"]);

        let found = resolver.resolve("Artist", "Title", None, None).unwrap();
        assert_eq!(found.lines[0].text, "late");
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
        assert_eq!(off_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_is_empty() {
        let mut resolver = LyricsResolver::new();
        assert!(resolver.is_empty());
        let (off, _) = stub("off", Reply::Nothing);
        resolver.add(off, false, 1);
        assert!(resolver.is_empty());
    }
}
