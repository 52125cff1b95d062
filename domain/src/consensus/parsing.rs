//! Confidence and score extraction from free-form model output.
//!
//! Model output is natural language, so every parser here is lenient and
//! returns `None` rather than failing. Callers substitute a defined default.
//!
//! | Function | Looks for | Fallback |
//! |----------|-----------|----------|
//! | [`parse_confidence`] | `{"confidence": x}`, `Confidence: x` | `None` |
//! | [`extract_confidence`] | same, and strips the tag from the answer | default |
//! | [`parse_critique_score`] | `{"score": x}`, `Score: x`, `N/10` | `None` |
//!
//! Values are normalized to [0, 1]. A bare number is read on the scale its
//! magnitude implies: anything up to 1 as-is (the scale the prompts ask
//! for), 2-5 as a five-point scale, up to 10 as a ten-point scale, up to 100
//! as a percentage. `1/5` or `20%` still select their explicit scale.

use super::scoring::clamp_unit;

const CONFIDENCE_TAG: &str = "confidence";
const SCORE_TAG: &str = "score";

/// A tag occurrence with its byte span in the source text
#[derive(Debug, Clone, Copy, PartialEq)]
struct TaggedValue {
    start: usize,
    end: usize,
    value: f64,
}

/// Parse a self-reported confidence from a model response.
///
/// # Examples
///
/// ```
/// use consensus_domain::consensus::parsing::parse_confidence;
///
/// assert_eq!(parse_confidence("Paris.\nConfidence: 0.9"), Some(0.9));
/// assert_eq!(parse_confidence("Paris. Confidence: 4/5"), Some(0.8));
/// assert_eq!(parse_confidence(r#"{"confidence": 0.25}"#), Some(0.25));
/// assert_eq!(parse_confidence("No tag here"), None);
/// ```
pub fn parse_confidence(response: &str) -> Option<f64> {
    parse_json_field(response, CONFIDENCE_TAG)
        .or_else(|| find_tagged_value(response, CONFIDENCE_TAG).map(|t| t.value))
}

/// Split a response into its answer text and confidence.
///
/// The trailing `Confidence:` tag is removed from the answer. When no
/// confidence can be parsed, `default` is returned and the text is left as is.
pub fn extract_confidence(response: &str, default: f64) -> (String, f64) {
    if let Some(value) = parse_json_field(response, CONFIDENCE_TAG) {
        return (response.trim().to_string(), value);
    }

    match find_tagged_value(response, CONFIDENCE_TAG) {
        Some(tagged) => {
            let mut answer = String::with_capacity(response.len());
            answer.push_str(&response[..tagged.start]);
            answer.push_str(&response[tagged.end..]);
            (tidy_answer(&answer), tagged.value)
        }
        None => (response.trim().to_string(), clamp_unit(default)),
    }
}

/// Parse a critique score in [0, 1] from a critic response.
///
/// ```
/// use consensus_domain::consensus::parsing::parse_critique_score;
///
/// assert_eq!(parse_critique_score("Solid answer.\nScore: 0.7"), Some(0.7));
/// assert_eq!(parse_critique_score("I rate this 8/10"), Some(0.8));
/// assert_eq!(parse_critique_score("Looks fine"), None);
/// ```
pub fn parse_critique_score(response: &str) -> Option<f64> {
    if let Some(value) = parse_json_field(response, SCORE_TAG) {
        return Some(value);
    }
    if let Some(tagged) = find_tagged_value(response, SCORE_TAG) {
        return Some(tagged.value);
    }

    // "N/10" anywhere in the text
    for word in response.split_whitespace() {
        let word = word.trim_end_matches(|c: char| !c.is_ascii_digit());
        if let Some(num_str) = word.strip_suffix("/10")
            && let Ok(num) = num_str.parse::<f64>()
            && (0.0..=10.0).contains(&num)
        {
            return Some(num / 10.0);
        }
    }

    None
}

fn parse_json_field(response: &str, field: &str) -> Option<f64> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    let parsed: serde_json::Value = serde_json::from_str(&response[start..=end]).ok()?;
    let number = parsed.get(field)?;
    normalize_bare(number.as_f64()?)
}

/// Find the last `<tag>: <value>` occurrence in the text.
fn find_tagged_value(text: &str, tag: &str) -> Option<TaggedValue> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();

    for (idx, _) in lower.rmatch_indices(tag) {
        let preceded_by_word = lower[..idx]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric());
        if preceded_by_word {
            continue;
        }

        let mut pos = skip_separators(&lower, idx + tag.len());
        if lower[pos..].starts_with("level") {
            pos = skip_separators(&lower, pos + "level".len());
        }

        let Some((number, num_end)) = read_number(&lower, pos) else {
            continue;
        };
        let Some((value, end)) = apply_scale(&lower, number, num_end) else {
            continue;
        };
        // Closing markup and sentence punctuation belong to the tag.
        let end = end
            + lower[end..]
                .chars()
                .take_while(|c| matches!(c, '.' | '*' | ')' | ']'))
                .count();

        return Some(TaggedValue {
            start: idx,
            end,
            value,
        });
    }

    None
}

fn skip_separators(s: &str, mut pos: usize) -> usize {
    for c in s[pos..].chars() {
        if matches!(c, ' ' | '\t' | ':' | '=' | '*' | '_' | '(' | '[') {
            pos += c.len_utf8();
        } else {
            break;
        }
    }
    pos
}

fn read_number(s: &str, pos: usize) -> Option<(f64, usize)> {
    let mut end = pos;
    let mut has_dot = false;
    for c in s[pos..].chars() {
        if c.is_ascii_digit() {
            end += 1;
        } else if c == '.' && !has_dot {
            has_dot = true;
            end += 1;
        } else {
            break;
        }
    }

    let token = s[pos..end].trim_end_matches('.');
    if token.is_empty() || !token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let end = pos + token.len();
    token.parse::<f64>().ok().map(|n| (n, end))
}

fn apply_scale(s: &str, number: f64, num_end: usize) -> Option<(f64, usize)> {
    let rest = &s[num_end..];

    if rest.starts_with('%') {
        return (number <= 100.0).then(|| (clamp_unit(number / 100.0), num_end + 1));
    }

    let trimmed = rest.trim_start_matches([' ', '\t']);
    if let Some(after_slash) = trimmed.strip_prefix('/') {
        let denom_offset = num_end + (rest.len() - after_slash.len());
        let denom_str = after_slash.trim_start_matches([' ', '\t']);
        let denom_start = denom_offset + (after_slash.len() - denom_str.len());
        let digits = denom_str.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0
            && let Ok(denom) = denom_str[..digits].parse::<f64>()
            && denom > 0.0
            && number <= denom
        {
            return Some((clamp_unit(number / denom), denom_start + digits));
        }
        return None;
    }

    normalize_bare(number).map(|v| (v, num_end))
}

fn normalize_bare(value: f64) -> Option<f64> {
    if value.is_nan() || value < 0.0 {
        return None;
    }
    let scaled = if value <= 1.0 {
        value
    } else if value <= 5.0 {
        value / 5.0
    } else if value <= 10.0 {
        value / 10.0
    } else if value <= 100.0 {
        value / 100.0
    } else {
        return None;
    };
    Some(clamp_unit(scaled))
}

fn tidy_answer(answer: &str) -> String {
    answer
        .lines()
        .map(str::trim_end)
        .filter(|line| !matches!(line.trim(), "**" | "*" | "()" | "[]"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
