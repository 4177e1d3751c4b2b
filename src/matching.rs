//! Candidate scoring for ambiguous search results.
//!
//! Every source shares the same scoring shape but keeps its own tuned
//! weights and acceptance threshold, see the `*_WEIGHTS` constants.

use crate::models::{MatchCandidate, TrackQuery};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightTable {
    pub title_exact: u32,
    pub title_partial: u32,
    pub artist: u32,
    pub album: u32,
    pub duration: u32,
    /// Seconds of slack allowed between candidate and target duration
    pub duration_tolerance: f64,
    /// Minimum score for a candidate to be accepted
    pub threshold: u32,
}

pub const LRCLIB_WEIGHTS: WeightTable = WeightTable {
    title_exact: 50,
    title_partial: 40,
    artist: 30,
    album: 15,
    duration: 10,
    duration_tolerance: 3.0,
    threshold: 50,
};

pub const NETEASE_WEIGHTS: WeightTable = WeightTable {
    title_exact: 80,
    title_partial: 50,
    artist: 40,
    album: 20,
    duration: 15,
    duration_tolerance: 5.0,
    threshold: 65,
};

pub const QQ_WEIGHTS: WeightTable = WeightTable {
    title_exact: 60,
    title_partial: 45,
    artist: 35,
    album: 15,
    duration: 10,
    duration_tolerance: 3.0,
    threshold: 55,
};

pub const MUSIXMATCH_WEIGHTS: WeightTable = WeightTable {
    title_exact: 50,
    title_partial: 40,
    artist: 30,
    album: 15,
    duration: 15,
    duration_tolerance: 5.0,
    threshold: 40,
};

pub const SPOTIFY_WEIGHTS: WeightTable = WeightTable {
    title_exact: 70,
    title_partial: 45,
    artist: 35,
    album: 20,
    duration: 15,
    duration_tolerance: 5.0,
    threshold: 60,
};

pub fn score(candidate: &MatchCandidate, target: &TrackQuery, weights: &WeightTable) -> u32 {
    let mut score = 0;

    let title = candidate.title.trim().to_lowercase();
    let target_title = target.title.trim().to_lowercase();
    if !title.is_empty() && !target_title.is_empty() {
        if title == target_title {
            score += weights.title_exact;
        } else if title.contains(&target_title) || target_title.contains(&title) {
            score += weights.title_partial;
        }
    }

    let target_artist = target.artist.trim().to_lowercase();
    if !target_artist.is_empty()
        && candidate.artists.iter().any(|artist| {
            let artist = artist.trim().to_lowercase();
            artist.contains(&target_artist)
        })
    {
        score += weights.artist;
    }

    if let (Some(album), Some(target_album)) = (&candidate.album, &target.album) {
        let album = album.trim().to_lowercase();
        let target_album = target_album.trim().to_lowercase();
        if !album.is_empty()
            && !target_album.is_empty()
            && (album.contains(&target_album) || target_album.contains(&album))
        {
            score += weights.album;
        }
    }

    if let (Some(duration), Some(target_duration)) = (candidate.duration_secs, target.duration_secs) {
        if (duration - target_duration).abs() <= weights.duration_tolerance {
            score += weights.duration;
        }
    }

    score
}

/// Highest-scoring candidate (first wins on ties) and its score.
/// The candidate is withheld when the score is under the threshold.
pub fn select_best<'a>(
    candidates: &'a [MatchCandidate],
    target: &TrackQuery,
    weights: &WeightTable,
) -> (Option<&'a MatchCandidate>, u32) {
    let mut best: Option<&MatchCandidate> = None;
    let mut best_score = 0;

    for candidate in candidates {
        let s = score(candidate, target, weights);
        if best.is_none() || s > best_score {
            best = Some(candidate);
            best_score = s;
        }
    }

    if best_score < weights.threshold {
        return (None, best_score);
    }
    (best, best_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, title: &str, artist: &str) -> MatchCandidate {
        MatchCandidate::new(id, title, vec![artist.to_string()])
    }

    fn target() -> TrackQuery {
        TrackQuery::new("Fallujah", "Kaleidoscopic Waves")
            .with_album(Some("Xenotaph".to_string()))
            .with_duration(Some(252.3))
    }

    #[test]
    fn test_full_match_scores_every_factor() {
        let c = candidate("1", "Kaleidoscopic Waves", "Fallujah")
            .with_album(Some("Xenotaph".to_string()))
            .with_duration(Some(253.0));
        assert_eq!(score(&c, &target(), &LRCLIB_WEIGHTS), 50 + 30 + 15 + 10);
    }

    #[test]
    fn test_partial_title_and_case_insensitivity() {
        let c = candidate("1", "KALEIDOSCOPIC WAVES (Remastered)", "fallujah");
        assert_eq!(score(&c, &target(), &LRCLIB_WEIGHTS), 40 + 30);
    }

    #[test]
    fn test_any_artist_in_list_counts() {
        let c = MatchCandidate::new(
            "1",
            "Other",
            vec!["Someone".to_string(), "Fallujah".to_string()],
        );
        assert_eq!(score(&c, &target(), &LRCLIB_WEIGHTS), 30);
    }

    #[test]
    fn test_artist_must_contain_target() {
        let featuring = candidate("1", "Other", "Fallujah feat. Someone");
        assert_eq!(score(&featuring, &target(), &LRCLIB_WEIGHTS), 30);

        let short = candidate("2", "Other", "a");
        assert_eq!(score(&short, &target(), &LRCLIB_WEIGHTS), 0);
    }

    #[test]
    fn test_duration_tolerance_is_source_specific() {
        let c = candidate("1", "x", "y").with_duration(Some(256.5));
        assert_eq!(score(&c, &target(), &LRCLIB_WEIGHTS), 0);
        assert_eq!(score(&c, &target(), &NETEASE_WEIGHTS), 15);
    }

    #[test]
    fn test_album_ignored_without_target_album() {
        let c = candidate("1", "x", "y").with_album(Some("Xenotaph".to_string()));
        let t = TrackQuery::new("Fallujah", "Kaleidoscopic Waves");
        assert_eq!(score(&c, &t, &LRCLIB_WEIGHTS), 0);
    }

    #[test]
    fn test_adding_a_factor_never_lowers_score() {
        let t = target();
        let tables = [
            LRCLIB_WEIGHTS,
            NETEASE_WEIGHTS,
            QQ_WEIGHTS,
            MUSIXMATCH_WEIGHTS,
            SPOTIFY_WEIGHTS,
        ];
        for weights in &tables {
            let base = candidate("1", "Unrelated", "Nobody");
            let steps = vec![
                base.clone(),
                MatchCandidate {
                    title: "Kaleidoscopic Waves Live".to_string(),
                    ..base.clone()
                },
                MatchCandidate {
                    title: "Kaleidoscopic Waves".to_string(),
                    ..base.clone()
                },
                MatchCandidate {
                    title: "Kaleidoscopic Waves".to_string(),
                    artists: vec!["Fallujah".to_string()],
                    ..base.clone()
                },
                MatchCandidate {
                    title: "Kaleidoscopic Waves".to_string(),
                    artists: vec!["Fallujah".to_string()],
                    album: Some("Xenotaph".to_string()),
                    ..base.clone()
                },
                MatchCandidate {
                    title: "Kaleidoscopic Waves".to_string(),
                    artists: vec!["Fallujah".to_string()],
                    album: Some("Xenotaph".to_string()),
                    duration_secs: Some(252.0),
                    ..base.clone()
                },
            ];
            let scores: Vec<u32> = steps.iter().map(|c| score(c, &t, weights)).collect();
            assert!(scores.windows(2).all(|w| w[0] < w[1]), "{scores:?}");
        }
    }

    #[test]
    fn test_select_best_first_wins_on_tie() {
        let candidates = vec![
            candidate("a", "Kaleidoscopic Waves", "Fallujah"),
            candidate("b", "Kaleidoscopic Waves", "Fallujah"),
        ];
        let (best, s) = select_best(&candidates, &target(), &LRCLIB_WEIGHTS);
        assert_eq!(best.unwrap().id, "a");
        assert_eq!(s, 80);
    }

    #[test]
    fn test_select_best_picks_strictly_highest() {
        let candidates = vec![
            candidate("a", "Kaleidoscopic Waves (Live)", "Fallujah"),
            candidate("b", "Kaleidoscopic Waves", "Fallujah").with_duration(Some(252.0)),
            candidate("c", "Kaleidoscopic Waves", "Fallujah"),
        ];
        let (best, s) = select_best(&candidates, &target(), &LRCLIB_WEIGHTS);
        assert_eq!(best.unwrap().id, "b");
        assert_eq!(s, 90);
    }

    #[test]
    fn test_lone_candidate_below_threshold_rejected() {
        let candidates = vec![candidate("a", "Something Else", "Fallujah")];
        let (best, s) = select_best(&candidates, &target(), &LRCLIB_WEIGHTS);
        assert!(best.is_none());
        assert_eq!(s, 30);
    }

    #[test]
    fn test_album_mismatch_falls_short_of_synthetic_strict_threshold() {
        // Not a source table: only a threshold above title + artist needs the album
        let strict = WeightTable {
            threshold: 90,
            ..LRCLIB_WEIGHTS
        };
        let candidates = vec![candidate("a", "Kaleidoscopic Waves", "Fallujah")
            .with_album(Some("The Flesh Prevails".to_string()))];
        let (best, s) = select_best(&candidates, &target(), &strict);
        assert!(best.is_none());
        assert_eq!(s, 80);
    }

    #[test]
    fn test_select_best_empty() {
        let (best, s) = select_best(&[], &target(), &LRCLIB_WEIGHTS);
        assert!(best.is_none());
        assert_eq!(s, 0);
    }
}
