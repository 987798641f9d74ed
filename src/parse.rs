//! Parser for the model's free-text FAQ reply.
//!
//! The prompt asks for `Qn:`/`Rn:` line pairs, but model output is advisory
//! at best. This scanner recovers whatever well-formed pairs it can find and
//! drops the rest: it never fails, whatever the input looks like. Callers
//! report how many pairs were recovered versus requested.

use crate::models::FaqPair;

/// Scan a model reply line by line and collect complete question/answer
/// pairs.
///
/// Rules, in order, applied to each trimmed non-empty line:
/// - `Q...:` opens a new question. Any pending complete pair is emitted
///   first. The digits before the colon become the pair's number; if there
///   are none, the marker is malformed and the pair it opens is dropped
///   wholesale, including its answer lines.
/// - `R...:` while a question is open sets the answer text. A second `R`
///   marker replaces it.
/// - Any other line while an answer is open is appended to it, space-joined.
///   Lines outside an open answer (preamble, commentary) are ignored.
///
/// A question without an answer, or with an empty one, is never emitted.
pub fn parse_faq_response(text: &str) -> Vec<FaqPair> {
    let mut pairs = Vec::new();
    let mut number: i64 = 0;
    let mut question: Option<String> = None;
    let mut answer: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('Q') && line.contains(':') {
            flush(&mut pairs, number, &mut question, &mut answer);
            let (head, tail) = match line.split_once(':') {
                Some(parts) => parts,
                None => continue,
            };
            match marker_digits(head) {
                Some(n) => {
                    number = n;
                    question = Some(tail.trim().to_string());
                }
                None => {
                    // Malformed ordinal: swallow this pair entirely.
                    question = None;
                }
            }
            answer = None;
        } else if line.starts_with('R') && line.contains(':') && question.is_some() {
            if let Some((_, tail)) = line.split_once(':') {
                answer = Some(tail.trim().to_string());
            }
        } else if !line.starts_with('Q') && !line.starts_with('R') {
            if let Some(a) = answer.as_mut() {
                a.push(' ');
                a.push_str(line);
            }
        }
    }

    flush(&mut pairs, number, &mut question, &mut answer);
    pairs
}

/// Emit the pending pair if both halves are present and non-empty, clearing
/// the slots either way.
fn flush(
    pairs: &mut Vec<FaqPair>,
    number: i64,
    question: &mut Option<String>,
    answer: &mut Option<String>,
) {
    if let (Some(q), Some(a)) = (question.take(), answer.take()) {
        if !q.is_empty() && !a.is_empty() {
            pairs.push(FaqPair {
                number,
                question: q,
                answer: a,
            });
        }
    }
}

/// Collect every digit of a marker head like `Q12` into a number.
fn marker_digits(head: &str) -> Option<i64> {
    let digits: String = head.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok()
}
