//! QQ Music
//!
//! Search goes through the desktop client's `musicu.fcg` JSON gateway,
//! lyrics through the legacy `fcg_query_lyric_new.fcg` endpoint with
//! base64 encoding turned off.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{artist_names, value_as_f64, value_as_string, LyricsProvider};
use crate::lyrics::parse_lrc;
use crate::matching::{select_best, QQ_WEIGHTS};
use crate::models::{LyricResult, MatchCandidate, TrackQuery};
use crate::reliability::{FetchError, HttpRequest, RetryExecutor};

const SEARCH_URL: &str = "https://u.y.qq.com/cgi-bin/musicu.fcg";
const LYRIC_URL: &str = "https://c.y.qq.com/lyric/fcgi-bin/fcg_query_lyric_new.fcg";
const REFERER: &str = "https://y.qq.com/";
const SEARCH_LIMIT: u32 = 10;

static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(\d+);").expect("valid regex"));

/// Lyrics come back HTML-escaped even with `nobase64=1`.
fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // `&amp;` last so escaped entities are not decoded twice
    text.replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub struct QqProvider {
    http: RetryExecutor,
    search_url: String,
    lyric_url: String,
}

impl QqProvider {
    /// `base_url` replaces the scheme and host of both endpoints.
    pub fn new(http: RetryExecutor, base_url: Option<String>) -> Self {
        let (search_url, lyric_url) = match base_url {
            Some(base) => (
                format!("{base}/cgi-bin/musicu.fcg"),
                format!("{base}/lyric/fcgi-bin/fcg_query_lyric_new.fcg"),
            ),
            None => (SEARCH_URL.to_string(), LYRIC_URL.to_string()),
        };
        Self {
            http,
            search_url,
            lyric_url,
        }
    }

    fn search(&self, query: &TrackQuery) -> Result<Vec<MatchCandidate>, FetchError> {
        let body = json!({
            "comm": {"ct": 19, "cv": 1859, "uin": "0"},
            "req": {
                "method": "DoSearchForQQMusicDesktop",
                "module": "music.search.SearchCgiService",
                "param": {
                    "num_per_page": SEARCH_LIMIT,
                    "page_num": 1,
                    "query": format!("{} {}", query.title, query.artist),
                    "search_type": 0
                }
            }
        });
        let request = HttpRequest::post(&self.search_url)
            .header("Referer", REFERER)
            .json(body);

        let data: Value = self.http.execute_json(&request)?;

        let code = data.pointer("/req/code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            warn!(provider = "qq", code, "search rejected");
            return Ok(Vec::new());
        }

        let songs = data
            .pointer("/req/data/body/song/list")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(songs.iter().filter_map(song_to_candidate).collect())
    }

    fn fetch_lyric(&self, song_mid: &str) -> Result<Option<String>, FetchError> {
        let request = HttpRequest::get(&self.lyric_url)
            .header("Referer", REFERER)
            .query("songmid", song_mid)
            .query("format", "json")
            .query("nobase64", 1)
            .query("g_tk", 5381);

        let data: Value = self.http.execute_json(&request)?;
        Ok(data
            .get("lyric")
            .and_then(Value::as_str)
            .filter(|l| !l.trim().is_empty())
            .map(decode_entities))
    }
}

fn song_to_candidate(song: &Value) -> Option<MatchCandidate> {
    let mid = value_as_string(song.get("mid"))?;
    let title = value_as_string(song.get("name")).or_else(|| value_as_string(song.get("title")))?;
    let artists = artist_names(song.get("singer"));
    let album = song.get("album").and_then(|a| value_as_string(a.get("name")));
    let duration = value_as_f64(song.get("interval"));

    Some(
        MatchCandidate::new(mid, title, artists)
            .with_album(album)
            .with_duration(duration),
    )
}

impl LyricsProvider for QqProvider {
    fn name(&self) -> &'static str {
        "qq"
    }

    fn get_lyrics(&mut self, query: &TrackQuery) -> Result<Option<LyricResult>> {
        let candidates = self.search(query)?;

        let (best, score) = select_best(&candidates, query, &QQ_WEIGHTS);
        let Some(best) = best else {
            debug!(provider = "qq", score, rows = candidates.len(), "no confident match");
            return Ok(None);
        };
        info!(provider = "qq", mid = %best.id, score, "matched track");

        let Some(lyric) = self.fetch_lyric(&best.id)? else {
            return Ok(None);
        };
        Ok(parse_lrc(&lyric).and_then(LyricResult::synced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reliability::testing::FakeTransport;
    use crate::reliability::RetryPolicy;
    use std::sync::Arc;
    use std::time::Duration;

    fn provider(fake: &Arc<FakeTransport>) -> QqProvider {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        QqProvider::new(RetryExecutor::new(fake.clone(), policy), None)
    }

    fn search_body() -> Value {
        json!({
            "code": 0,
            "req": {
                "code": 0,
                "data": {
                    "body": {
                        "song": {
                            "list": [
                                {
                                    "mid": "001Qu4I30eVFYb",
                                    "name": "晴天",
                                    "singer": [{"mid": "0025NhlN2yWrP4", "name": "周杰伦"}],
                                    "album": {"name": "叶惠美"},
                                    "interval": 269
                                }
                            ]
                        }
                    }
                }
            }
        })
    }

    fn query() -> TrackQuery {
        TrackQuery::new("周杰伦", "晴天").with_duration(Some(269.5))
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("It&apos;s &quot;fine&quot;"), "It's \"fine\"");
        assert_eq!(decode_entities("&#58;&#40;x&#41;"), ":(x)");
        assert_eq!(decode_entities("a &amp;lt; b"), "a &lt; b");
        assert_eq!(decode_entities("&lt;3 &gt;"), "<3 >");
    }

    #[test]
    fn test_search_then_lyrics() {
        let fake = Arc::new(
            FakeTransport::new()
                .respond_json("musicu.fcg", search_body())
                .respond_json(
                    "fcg_query_lyric_new.fcg",
                    json!({
                        "retcode": 0,
                        "lyric": "[ti&#58;晴天]\n[00&#58;01&#46;00]故事的小黄花\n[00&#58;04&#46;50]从出生那年就飘着\n[00&#58;06&#46;00]"
                    }),
                ),
        );

        let result = provider(&fake).get_lyrics(&query()).unwrap().unwrap();
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[0].text, "故事的小黄花");
        assert_eq!(result.lines[1].timestamp, 4.5);

        let calls = fake.calls();
        let search = &calls[0];
        assert_eq!(
            search.json.as_ref().unwrap()["req"]["method"],
            "DoSearchForQQMusicDesktop"
        );
        assert!(calls[1].full_url().contains("songmid=001Qu4I30eVFYb"));
        assert!(calls[1].full_url().contains("nobase64=1"));
    }

    #[test]
    fn test_rejected_search_is_none() {
        let fake = Arc::new(
            FakeTransport::new().respond_json("musicu.fcg", json!({"code": 0, "req": {"code": 2001}})),
        );
        assert!(provider(&fake).get_lyrics(&query()).unwrap().is_none());
        assert_eq!(fake.call_count("fcg_query_lyric_new"), 0);
    }

    #[test]
    fn test_missing_lyric_is_none() {
        let fake = Arc::new(
            FakeTransport::new()
                .respond_json("musicu.fcg", search_body())
                .respond_json("fcg_query_lyric_new.fcg", json!({"retcode": -1901, "lyric": ""})),
        );
        assert!(provider(&fake).get_lyrics(&query()).unwrap().is_none());
    }

    #[test]
    fn test_transport_failure_is_an_error() {
        let fake = Arc::new(FakeTransport::new().fail("musicu.fcg"));
        assert!(provider(&fake).get_lyrics(&query()).is_err());
    }

    #[test]
    fn test_base_url_override() {
        let http = RetryExecutor::new(Arc::new(FakeTransport::new()), RetryPolicy::default());
        let p = QqProvider::new(http, Some("http://localhost:9000".to_string()));
        assert_eq!(p.search_url, "http://localhost:9000/cgi-bin/musicu.fcg");
        assert_eq!(
            p.lyric_url,
            "http://localhost:9000/lyric/fcgi-bin/fcg_query_lyric_new.fcg"
        );
    }
}
