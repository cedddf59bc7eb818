// src/transit.rs
//! Pure countdown-token formatting for the transit screen.
//!
//! Predictions arrive as raw route/direction/countdown triples; this
//! module filters and normalizes them into the bounded token lists the
//! renderer rotates through. No I/O, no state.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::model::{Prediction, Token, MAX_TOKENS};

/// Countdown shown when a row has no usable predictions.
pub const NO_ARRIVALS: &str = "NOA";

/// Extract at most `max_items` display tokens from raw predictions,
/// optionally filtered to one direction of travel.
///
/// Numeric countdowns are capped at 99; anything else is uppercased and
/// passed through. The result is never empty: an empty prediction list
/// (or one emptied by the filter) yields a single [`NO_ARRIVALS`] token.
pub fn extract_tokens(
    preds: &[Prediction],
    direction: Option<&str>,
    max_items: usize,
) -> Vec<Token, MAX_TOKENS> {
    let mut out: Vec<Token, MAX_TOKENS> = Vec::new();
    let limit = max_items.min(MAX_TOKENS);

    for p in preds {
        if out.len() >= limit {
            break;
        }
        if let Some(want) = direction {
            if p.direction.as_str() != want {
                continue;
            }
        }

        let raw = p.countdown.as_str();
        let mut token = Token::new();
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            let n: u64 = raw.parse().unwrap_or(99).min(99);
            let _ = write!(token, "{}", n);
        } else {
            for c in raw.chars() {
                let _ = token.push(c.to_ascii_uppercase());
            }
        }
        let _ = out.push(token);
    }

    if out.is_empty() {
        let mut fallback = Token::new();
        let _ = fallback.push_str(NO_ARRIVALS);
        let _ = out.push(fallback);
    }
    out
}

/// Normalize a token to exactly three characters for the fixed-width
/// countdown column: right-aligned minutes capped at 99, canonical
/// "DUE"/"DLY"/"NOA", otherwise the first three characters uppercased
/// and padded.
pub fn token3(s: &str) -> String<3> {
    let mut out: String<3> = String::new();
    let t = s.trim();

    if t.is_empty() || t == "-" || t == "\u{2014}" {
        let _ = out.push_str(NO_ARRIVALS);
        return out;
    }

    if t.bytes().all(|b| b.is_ascii_digit()) {
        let n: u64 = t.parse().unwrap_or(99).min(99);
        let _ = write!(out, "{:>3}", n);
        return out;
    }

    let upper_starts = |prefix: &str| {
        t.chars()
            .zip(prefix.chars())
            .filter(|(a, b)| a.to_ascii_uppercase() == *b)
            .count()
            == prefix.len()
    };
    let canonical = if upper_starts("DU") {
        Some("DUE")
    } else if upper_starts("DL") {
        Some("DLY")
    } else if upper_starts("NO") {
        Some(NO_ARRIVALS)
    } else {
        None
    };
    if let Some(c) = canonical {
        let _ = out.push_str(c);
        return out;
    }

    for c in t.chars().take(3) {
        let _ = out.push(c.to_ascii_uppercase());
    }
    while out.len() < 3 {
        let _ = out.push(' ');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(direction: &str, countdown: &str) -> Prediction {
        let mut d = heapless::String::new();
        let _ = d.push_str(direction);
        let mut c = Token::new();
        let _ = c.push_str(countdown);
        Prediction {
            route: heapless::String::new(),
            direction: d,
            countdown: c,
        }
    }

    #[test]
    fn empty_predictions_yield_single_fallback() {
        let tokens = extract_tokens(&[], None, 5);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_str(), "NOA");
    }

    #[test]
    fn direction_filter_applies() {
        let preds = [
            pred("Southbound", "4"),
            pred("Northbound", "7"),
            pred("Southbound", "12"),
        ];
        let tokens = extract_tokens(&preds, Some("Southbound"), 5);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].as_str(), "4");
        assert_eq!(tokens[1].as_str(), "12");
    }

    #[test]
    fn filter_removing_everything_still_yields_fallback() {
        let preds = [pred("Northbound", "4")];
        let tokens = extract_tokens(&preds, Some("Southbound"), 5);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_str(), "NOA");
    }

    #[test]
    fn tokens_capped_at_max_items_and_99_minutes() {
        let preds = [
            pred("Westbound", "105"),
            pred("Westbound", "2"),
            pred("Westbound", "due"),
            pred("Westbound", "8"),
            pred("Westbound", "15"),
            pred("Westbound", "30"),
        ];
        let tokens = extract_tokens(&preds, None, 5);
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].as_str(), "99");
        assert_eq!(tokens[2].as_str(), "DUE");
    }

    #[test]
    fn token3_right_aligns_minutes() {
        assert_eq!(token3("5").as_str(), "  5");
        assert_eq!(token3("42").as_str(), " 42");
        assert_eq!(token3("120").as_str(), " 99");
    }

    #[test]
    fn token3_canonicalizes_status_codes() {
        assert_eq!(token3("due").as_str(), "DUE");
        assert_eq!(token3("DUE SOON").as_str(), "DUE");
        assert_eq!(token3("dly").as_str(), "DLY");
        assert_eq!(token3("no arrivals").as_str(), "NOA");
        assert_eq!(token3("").as_str(), "NOA");
        assert_eq!(token3("-").as_str(), "NOA");
        assert_eq!(token3("\u{2014}").as_str(), "NOA");
    }

    #[test]
    fn token3_truncates_and_pads_other_text() {
        assert_eq!(token3("held").as_str(), "HEL");
        assert_eq!(token3("x").as_str(), "X  ");
    }
}
