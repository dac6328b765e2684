use serde::Deserialize;

use crate::error::Result;

#[derive(Clone, Debug, Deserialize)]
struct WordFile {
    #[serde(default)]
    transcription: String,
    #[serde(default)]
    words: Vec<WordTiming>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordTiming {
    start_time: f64,
    end_time: f64,
}

/// A read-only transcript word shown as a region on the waveform.
#[derive(Clone, Debug, PartialEq)]
pub struct WordRegion {
    pub index: usize,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Parses the transcript JSON (`transcription` text plus per-word timings).
/// The n-th timing takes the n-th whitespace-separated word of the text; extra
/// timings get an empty label. Timings with `end <= start` are dropped.
pub fn parse_words(text: &str) -> Result<Vec<WordRegion>> {
    let data: WordFile = serde_json::from_str(text)?;
    let tokens: Vec<&str> = data.transcription.split_whitespace().collect();
    let out = data
        .words
        .iter()
        .enumerate()
        .filter(|(_, w)| w.end_time > w.start_time && w.start_time >= 0.0)
        .map(|(index, w)| WordRegion {
            index,
            text: tokens.get(index).copied().unwrap_or_default().to_string(),
            start: w.start_time,
            end: w.end_time,
        })
        .collect();
    Ok(out)
}

/// Index of the word under `time`, for click-to-seek.
pub fn word_at(words: &[WordRegion], time: f64) -> Option<usize> {
    words
        .iter()
        .position(|w| w.start <= time && time < w.end)
}
