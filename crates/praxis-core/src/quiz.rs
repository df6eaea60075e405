//! Quiz answer processing.
//!
//! Public quiz submissions arrive as a JSON object keyed by question id with
//! loosely-typed values (form posts turn everything into strings). Each answer
//! is coerced according to its question kind and paired with a display string
//! that ends up in the lead's notes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::QuizQuestion;
use crate::enums::QuestionKind;
use crate::errors::CoreError;

/// Highest value accepted by `scale` questions (lowest is 0).
pub const SCALE_MAX: i64 = 10;

const TRUE_WORDS: &[&str] = &["true", "yes", "y", "sim", "s", "1", "on"];
const FALSE_WORDS: &[&str] = &["false", "no", "n", "não", "nao", "0", "off"];

/// A coerced answer, stored in `leads.metadata.answers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedAnswer {
    pub question_id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub value: Value,
    pub display: String,
}

/// Coerce every answer in `raw` against its question.
///
/// Questions are processed in the order given (callers pass them sorted by
/// position). Answers for unknown question ids are ignored.
///
/// # Errors
///
/// Returns `CoreError::Validation` when a required question is unanswered or
/// a value cannot be coerced to the question's kind.
pub fn process_answers(
    questions: &[QuizQuestion],
    raw: &Map<String, Value>,
) -> Result<Vec<ProcessedAnswer>, CoreError> {
    let mut processed = Vec::with_capacity(questions.len());

    for question in questions {
        let value = raw.get(&question.id).filter(|v| !is_blank(v));
        let Some(value) = value else {
            if question.required {
                return Err(CoreError::Validation(format!(
                    "question '{}' requires an answer",
                    question.prompt
                )));
            }
            continue;
        };

        let (value, display) = match question.kind {
            QuestionKind::Text => coerce_text(question, value)?,
            QuestionKind::Number => coerce_number(question, value)?,
            QuestionKind::Boolean => coerce_boolean(question, value)?,
            QuestionKind::SingleChoice => coerce_single_choice(question, value)?,
            QuestionKind::MultipleChoice => match coerce_multiple_choice(question, value)? {
                Some(pair) => pair,
                None if question.required => {
                    return Err(CoreError::Validation(format!(
                        "question '{}' requires an answer",
                        question.prompt
                    )));
                }
                None => continue,
            },
            QuestionKind::Scale => coerce_scale(question, value)?,
        };

        processed.push(ProcessedAnswer {
            question_id: question.id.clone(),
            prompt: question.prompt.clone(),
            kind: question.kind,
            value,
            display,
        });
    }

    Ok(processed)
}

/// One `"prompt: display"` line per answer.
#[must_use]
pub fn summary(answers: &[ProcessedAnswer]) -> String {
    answers
        .iter()
        .map(|a| format!("{}: {}", a.prompt, a.display))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn invalid(question: &QuizQuestion, expected: &str) -> CoreError {
    CoreError::Validation(format!(
        "answer to '{}' must be {expected}",
        question.prompt
    ))
}

fn coerce_text(question: &QuizQuestion, value: &Value) -> Result<(Value, String), CoreError> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => return Err(invalid(question, "text")),
    };
    Ok((Value::String(text.clone()), text))
}

fn coerce_number(question: &QuizQuestion, value: &Value) -> Result<(Value, String), CoreError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
    .ok_or_else(|| invalid(question, "a number"))?;

    let json = serde_json::Number::from_f64(number)
        .map(Value::Number)
        .ok_or_else(|| invalid(question, "a number"))?;
    Ok((json, format_number(number)))
}

fn coerce_boolean(question: &QuizQuestion, value: &Value) -> Result<(Value, String), CoreError> {
    let flag = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => {
            let word = s.trim().to_lowercase();
            if TRUE_WORDS.contains(&word.as_str()) {
                Some(true)
            } else if FALSE_WORDS.contains(&word.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
    .ok_or_else(|| invalid(question, "yes or no"))?;

    let display = if flag { "Yes" } else { "No" };
    Ok((Value::Bool(flag), display.to_string()))
}

fn coerce_single_choice(
    question: &QuizQuestion,
    value: &Value,
) -> Result<(Value, String), CoreError> {
    let picked = scalar_to_string(value).ok_or_else(|| invalid(question, "one of the options"))?;
    let option = match_option(question, &picked)
        .ok_or_else(|| invalid(question, "one of the options"))?;
    Ok((Value::String(option.clone()), option))
}

fn coerce_multiple_choice(
    question: &QuizQuestion,
    value: &Value,
) -> Result<Option<(Value, String)>, CoreError> {
    let picked: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| scalar_to_string(item).ok_or_else(|| invalid(question, "a list of options")))
            .collect::<Result<_, _>>()?,
        // A whole-string match wins so options containing commas stay pickable.
        Value::String(s) => match match_option(question, s) {
            Some(option) => vec![option],
            None => s.split(',').map(str::to_string).collect(),
        },
        _ => return Err(invalid(question, "a list of options")),
    };

    let mut selected: Vec<String> = Vec::new();
    for raw in picked {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let option = match_option(question, raw)
            .ok_or_else(|| invalid(question, "a list of options"))?;
        if !selected.contains(&option) {
            selected.push(option);
        }
    }

    if selected.is_empty() {
        return Ok(None);
    }
    let display = selected.join(", ");
    let json = Value::Array(selected.into_iter().map(Value::String).collect());
    Ok(Some((json, display)))
}

fn coerce_scale(question: &QuizQuestion, value: &Value) -> Result<(Value, String), CoreError> {
    let expected = format!("a whole number from 0 to {SCALE_MAX}");
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(question, &expected))?;

    if number.fract() != 0.0 || !(0.0..=10.0).contains(&number) {
        return Err(invalid(question, &expected));
    }
    #[allow(clippy::cast_possible_truncation)]
    let level = number as i64;
    Ok((Value::from(level), level.to_string()))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Case-insensitive option lookup returning the canonical option text.
fn match_option(question: &QuizQuestion, raw: &str) -> Option<String> {
    let needle = raw.trim().to_lowercase();
    question
        .options
        .iter()
        .find(|o| o.trim().to_lowercase() == needle)
        .cloned()
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = n as i64;
        whole.to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn question(id: &str, kind: QuestionKind, options: &[&str], required: bool) -> QuizQuestion {
        QuizQuestion {
            id: id.to_string(),
            quiz_id: "qiz-1".to_string(),
            prompt: format!("Prompt {id}"),
            kind,
            options: options.iter().map(|s| (*s).to_string()).collect(),
            required,
            position: 0,
        }
    }

    fn answers(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[rstest]
    #[case(json!(true), true)]
    #[case(json!("yes"), true)]
    #[case(json!(" Sim "), true)]
    #[case(json!("1"), true)]
    #[case(json!(1), true)]
    #[case(json!("false"), false)]
    #[case(json!("não"), false)]
    #[case(json!(0), false)]
    fn boolean_coercion(#[case] raw: Value, #[case] expected: bool) {
        let q = question("q1", QuestionKind::Boolean, &[], true);
        let out = process_answers(&[q], &answers(json!({ "q1": raw }))).unwrap();
        assert_eq!(out[0].value, Value::Bool(expected));
        assert_eq!(out[0].display, if expected { "Yes" } else { "No" });
    }

    #[test]
    fn boolean_rejects_garbage() {
        let q = question("q1", QuestionKind::Boolean, &[], true);
        let result = process_answers(&[q], &answers(json!({ "q1": "maybe" })));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[rstest]
    #[case(json!("42"), json!(42.0), "42")]
    #[case(json!("3,5"), json!(3.5), "3.5")]
    #[case(json!(7), json!(7.0), "7")]
    fn number_coercion(#[case] raw: Value, #[case] value: Value, #[case] display: &str) {
        let q = question("q1", QuestionKind::Number, &[], true);
        let out = process_answers(&[q], &answers(json!({ "q1": raw }))).unwrap();
        assert_eq!(out[0].value, value);
        assert_eq!(out[0].display, display);
    }

    #[test]
    fn number_rejects_text() {
        let q = question("q1", QuestionKind::Number, &[], false);
        let result = process_answers(&[q], &answers(json!({ "q1": "forty" })));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn multiple_choice_from_comma_string_dedupes_and_canonicalizes() {
        let q = question(
            "q1",
            QuestionKind::MultipleChoice,
            &["Back pain", "Headache", "Insomnia"],
            true,
        );
        let out = process_answers(
            &[q],
            &answers(json!({ "q1": "headache, Back pain ,HEADACHE" })),
        )
        .unwrap();
        assert_eq!(out[0].value, json!(["Headache", "Back pain"]));
        assert_eq!(out[0].display, "Headache, Back pain");
    }

    #[test]
    fn multiple_choice_option_with_comma() {
        let q = question(
            "q1",
            QuestionKind::MultipleChoice,
            &["Sim, às vezes", "Nunca"],
            true,
        );
        let out = process_answers(&[q.clone()], &answers(json!({ "q1": "sim, às vezes" }))).unwrap();
        assert_eq!(out[0].value, json!(["Sim, às vezes"]));

        let out = process_answers(&[q], &answers(json!({ "q1": ["Sim, às vezes", "nunca"] }))).unwrap();
        assert_eq!(out[0].value, json!(["Sim, às vezes", "Nunca"]));
    }

    #[test]
    fn multiple_choice_from_array() {
        let q = question("q1", QuestionKind::MultipleChoice, &["A", "B"], true);
        let out = process_answers(&[q], &answers(json!({ "q1": ["b", "a"] }))).unwrap();
        assert_eq!(out[0].value, json!(["B", "A"]));
    }

    #[test]
    fn multiple_choice_rejects_unknown_option() {
        let q = question("q1", QuestionKind::MultipleChoice, &["A", "B"], true);
        let result = process_answers(&[q], &answers(json!({ "q1": "A, C" })));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn single_choice_canonical_option() {
        let q = question("q1", QuestionKind::SingleChoice, &["Morning", "Evening"], true);
        let out = process_answers(&[q], &answers(json!({ "q1": "evening" }))).unwrap();
        assert_eq!(out[0].value, json!("Evening"));
    }

    #[rstest]
    #[case(json!("11"))]
    #[case(json!(-1))]
    #[case(json!("6.5"))]
    fn scale_out_of_range(#[case] raw: Value) {
        let q = question("q1", QuestionKind::Scale, &[], true);
        let result = process_answers(&[q], &answers(json!({ "q1": raw })));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn scale_accepts_numeric_string() {
        let q = question("q1", QuestionKind::Scale, &[], true);
        let out = process_answers(&[q], &answers(json!({ "q1": "8" }))).unwrap();
        assert_eq!(out[0].value, json!(8));
        assert_eq!(out[0].display, "8");
    }

    #[test]
    fn missing_required_answer_fails() {
        let q = question("q1", QuestionKind::Text, &[], true);
        let result = process_answers(&[q], &answers(json!({ "q1": "   " })));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn missing_optional_answer_is_skipped() {
        let questions = vec![
            question("q1", QuestionKind::Text, &[], false),
            question("q2", QuestionKind::Text, &[], true),
        ];
        let out = process_answers(&questions, &answers(json!({ "q2": " Hello " }))).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].question_id, "q2");
        assert_eq!(out[0].display, "Hello");
    }

    #[test]
    fn summary_lists_prompt_and_display() {
        let questions = vec![
            question("q1", QuestionKind::Boolean, &[], true),
            question("q2", QuestionKind::Scale, &[], true),
        ];
        let out = process_answers(&questions, &answers(json!({ "q1": "yes", "q2": 4 }))).unwrap();
        assert_eq!(summary(&out), "Prompt q1: Yes\nPrompt q2: 4");
    }
}
