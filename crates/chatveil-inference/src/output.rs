//! Output-grammar parser for generative model text
//!
//! Expected shape, loosely matched:
//!
//! ```text
//! sentiment:positive|negative|neutral
//! confidence:0.0-1.0
//! ```
//!
//! The two fields are located by independent pattern searches, so they may
//! appear in any order and embedded in surrounding prose. Quotes, colons
//! and spacing are tolerated; label values are case-sensitive.

use chatveil_core::{Error, Result, Sentiment};
use regex::Regex;
use std::sync::OnceLock;

/// Sentiment + confidence pair parsed from generative output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedSentiment {
    pub sentiment: Sentiment,
    pub confidence: f32,
}

fn sentiment_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""?sentiment"?\s*:\s*"?(positive|negative|neutral)"?"#)
            .unwrap_or_else(|e| panic!("invalid sentiment pattern: {e}"))
    })
}

fn confidence_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""?confidence"?\s*:\s*([0-9]*\.?[0-9]+)"#)
            .unwrap_or_else(|e| panic!("invalid confidence pattern: {e}"))
    })
}

fn truncate_for_error(output: &str) -> String {
    const LIMIT: usize = 200;
    if output.len() <= LIMIT {
        output.to_string()
    } else {
        let mut end = LIMIT;
        while !output.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &output[..end])
    }
}

/// Parse raw generative output into a typed sentiment+confidence pair.
///
/// Fails with [`Error::EmptyOutput`] on blank input, [`Error::OutputFormat`]
/// when either field is missing, and [`Error::InvalidConfidence`] when the
/// confidence number parses but is not finite within [0, 1].
pub fn parse_sentiment_output(output: &str) -> Result<ParsedSentiment> {
    if output.trim().is_empty() {
        return Err(Error::EmptyOutput);
    }

    let sentiment_match = sentiment_pattern().captures(output);
    let confidence_match = confidence_pattern().captures(output);

    let (Some(sentiment_match), Some(confidence_match)) = (sentiment_match, confidence_match)
    else {
        return Err(Error::output_format(format!(
            "expected `sentiment:positive|negative|neutral` and `confidence:0.0-1.0`, got: {}",
            truncate_for_error(output)
        )));
    };

    let sentiment = match &sentiment_match[1] {
        "positive" => Sentiment::Positive,
        "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    };

    let confidence: f32 = confidence_match[1].parse().map_err(|_| {
        Error::output_format(format!(
            "confidence is not a number: {}",
            truncate_for_error(output)
        ))
    })?;

    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(Error::InvalidConfidence(confidence));
    }

    Ok(ParsedSentiment {
        sentiment,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_output() {
        let parsed = parse_sentiment_output("sentiment:negative\nconfidence:0.87").unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Negative);
        assert_eq!(parsed.confidence, 0.87);
    }

    #[test]
    fn fields_may_appear_in_any_order() {
        let parsed = parse_sentiment_output("confidence:0.4\nsentiment:neutral").unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Neutral);
        assert_eq!(parsed.confidence, 0.4);
    }

    #[test]
    fn tolerates_quotes_and_spacing() {
        let parsed =
            parse_sentiment_output(r#"{"sentiment" : "positive", "confidence" : 0.95}"#).unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Positive);
        assert_eq!(parsed.confidence, 0.95);
    }

    #[test]
    fn tolerates_surrounding_prose() {
        let parsed = parse_sentiment_output(
            "Sure! Here is the analysis:\nsentiment:positive\nconfidence:0.6\nHope that helps.",
        )
        .unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Positive);
    }

    #[test]
    fn label_values_are_case_sensitive() {
        assert!(matches!(
            parse_sentiment_output("sentiment:Negative\nconfidence:0.9"),
            Err(Error::OutputFormat(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(matches!(
            parse_sentiment_output("confidence:1.5\nsentiment:positive"),
            Err(Error::InvalidConfidence(c)) if c == 1.5
        ));
    }

    #[test]
    fn accepts_boundary_confidences() {
        assert_eq!(
            parse_sentiment_output("sentiment:neutral\nconfidence:0.0")
                .unwrap()
                .confidence,
            0.0
        );
        assert_eq!(
            parse_sentiment_output("sentiment:neutral\nconfidence:1.0")
                .unwrap()
                .confidence,
            1.0
        );
    }

    #[test]
    fn rejects_missing_confidence() {
        assert!(matches!(
            parse_sentiment_output("I think positive"),
            Err(Error::OutputFormat(_))
        ));
    }

    #[test]
    fn rejects_empty_output() {
        assert!(matches!(
            parse_sentiment_output("   \n "),
            Err(Error::EmptyOutput)
        ));
    }
}
