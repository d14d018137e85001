//! Filler-word detection over transcript word timings.
//!
//! The lexicon is tiered by how strong a disfluency signal each token
//! carries; the sensitivity scalar gates which tiers are admitted. Matching
//! runs on normalized forms: lowercase, punctuation stripped, accents
//! folded.

use tracing::warn;

use autocut_models::{FillerHit, TranscriptSegment, WordTiming};

/// Core hesitations, always admitted.
const TIER1: &[&str] = &["euh", "heu", "euuh", "heuuh", "hum", "hmm", "mmmh"];

/// Weak interjections, admitted at sensitivity >= 0.5.
const TIER2: &[&str] = &["ben", "bah", "bof", "ah", "aah", "oh", "ooh"];

/// Discourse fillers, admitted at sensitivity >= 0.7.
const TIER3: &[&str] = &[
    "en fait",
    "du coup",
    "genre",
    "tu vois",
    "c'est-à-dire",
    "enfin bon",
    "bon ben",
];

/// Maximum gap between duplicated words to count as a stutter.
const DUPLICATE_WINDOW_S: f64 = 0.250;

/// The tiered filler lexicon with normalized entries.
pub struct FillerLexicon {
    /// (normalized single token, tier)
    singles: Vec<(String, u8)>,
    /// (normalized word sequence, tier)
    phrases: Vec<(Vec<String>, u8)>,
}

impl FillerLexicon {
    /// Build the built-in lexicon.
    pub fn builtin() -> Self {
        let mut singles = Vec::new();
        let mut phrases = Vec::new();
        for (tier, entries) in [(1u8, TIER1), (2, TIER2), (3, TIER3)] {
            for entry in entries {
                let mut parts: Vec<String> = entry
                    .split_whitespace()
                    .map(normalize_word)
                    .filter(|w| !w.is_empty())
                    .collect();
                match parts.len() {
                    0 => {}
                    1 => singles.push((parts.remove(0), tier)),
                    _ => phrases.push((parts, tier)),
                }
            }
        }
        Self { singles, phrases }
    }

    /// Highest tier admitted for a sensitivity value.
    pub fn admitted_tier(sensitivity: f64) -> u8 {
        if sensitivity >= 0.7 {
            3
        } else if sensitivity >= 0.5 {
            2
        } else {
            1
        }
    }

    fn single_tier(&self, word: &str) -> Option<u8> {
        self.singles
            .iter()
            .find(|(w, _)| w == word)
            .map(|(_, tier)| *tier)
    }

    fn phrase_tier(&self, words: &[String]) -> Option<u8> {
        self.phrases
            .iter()
            .find(|(p, _)| p.as_slice() == words)
            .map(|(_, tier)| *tier)
    }

    fn longest_phrase(&self) -> usize {
        self.phrases.iter().map(|(p, _)| p.len()).max().unwrap_or(1)
    }
}

/// Normalize a word: lowercase, accent-fold, keep alphanumerics only.
pub fn normalize_word(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'à' | 'â' | 'ä' => Some('a'),
            'é' | 'è' | 'ê' | 'ë' => Some('e'),
            'î' | 'ï' => Some('i'),
            'ô' | 'ö' => Some('o'),
            'ù' | 'û' | 'ü' => Some('u'),
            'ç' => Some('c'),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// Detect filler words in transcript segments.
///
/// Word-level timings are used when present; a segment without them only
/// matches when its whole text is a single lexicon entry. When no interval
/// can be constructed at all, the result is empty and a warning is logged —
/// timings are never fabricated.
pub fn detect_fillers(segments: &[TranscriptSegment], sensitivity: f64) -> Vec<FillerHit> {
    let lexicon = FillerLexicon::builtin();
    let max_tier = FillerLexicon::admitted_tier(sensitivity);
    let confidence_bar = sensitivity * 0.5;

    let mut hits: Vec<FillerHit> = Vec::new();
    let mut had_word_timings = false;

    for segment in segments {
        match &segment.words {
            Some(words) if !words.is_empty() => {
                had_word_timings = true;
                detect_in_words(words, &lexicon, max_tier, confidence_bar, &mut hits);
            }
            _ => {
                // Whole-segment fallback: the parent interval is usable only
                // when the entire segment is one lexicon entry.
                let normalized: Vec<String> = segment
                    .text
                    .split_whitespace()
                    .map(normalize_word)
                    .filter(|w| !w.is_empty())
                    .collect();
                let tier = match normalized.len() {
                    1 => lexicon.single_tier(&normalized[0]),
                    2.. => lexicon.phrase_tier(&normalized),
                    _ => None,
                };
                if let Some(tier) = tier {
                    if tier <= max_tier {
                        hits.push(FillerHit {
                            word: normalized.join(" "),
                            start_s: segment.start_s,
                            end_s: segment.end_s,
                            confidence: 1.0,
                        });
                    }
                }
            }
        }
    }

    if !had_word_timings && hits.is_empty() && !segments.is_empty() {
        warn!("transcript has no word-level timings; filler detection yields nothing");
    }

    hits.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
    hits.dedup_by(|a, b| a.start_s == b.start_s && a.end_s == b.end_s);
    hits
}

fn detect_in_words(
    words: &[WordTiming],
    lexicon: &FillerLexicon,
    max_tier: u8,
    confidence_bar: f64,
    hits: &mut Vec<FillerHit>,
) {
    let normalized: Vec<String> = words.iter().map(|w| normalize_word(&w.text)).collect();
    let max_phrase = lexicon.longest_phrase();

    let mut i = 0;
    while i < words.len() {
        // Longest-match phrases first so "bon ben" wins over "ben".
        let mut matched_len = 0;
        for len in (2..=max_phrase.min(words.len() - i)).rev() {
            let slice = &normalized[i..i + len];
            if let Some(tier) = lexicon.phrase_tier(slice) {
                if tier <= max_tier {
                    let confidence = words[i..i + len]
                        .iter()
                        .map(|w| w.confidence)
                        .fold(f64::INFINITY, f64::min);
                    if confidence >= confidence_bar {
                        hits.push(FillerHit {
                            word: slice.join(" "),
                            start_s: words[i].start_s,
                            end_s: words[i + len - 1].end_s,
                            confidence,
                        });
                        matched_len = len;
                        break;
                    }
                }
            }
        }
        if matched_len > 0 {
            i += matched_len;
            continue;
        }

        let word = &words[i];
        let norm = &normalized[i];

        if let Some(tier) = lexicon.single_tier(norm) {
            if tier <= max_tier && word.confidence >= confidence_bar {
                hits.push(FillerHit {
                    word: norm.clone(),
                    start_s: word.start_s,
                    end_s: word.end_s,
                    confidence: word.confidence,
                });
                i += 1;
                continue;
            }
        }

        // Immediate duplicate ("je je"): the second occurrence is a stutter
        // when it follows within 250 ms. Duplicates rank as tier 1.
        if i > 0
            && !norm.is_empty()
            && *norm == normalized[i - 1]
            && word.start_s - words[i - 1].end_s <= DUPLICATE_WINDOW_S
            && word.confidence >= confidence_bar
        {
            hits.push(FillerHit {
                word: norm.clone(),
                start_s: word.start_s,
                end_s: word.end_s,
                confidence: word.confidence,
            });
        }

        i += 1;
    }
}
