use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TutorError};
use crate::validation::ValidationErrors;

/// Fewer parsed questions than this and the templates are used instead.
pub const MIN_GENERATED_QUESTIONS: usize = 3;

pub const COMMON_QUESTIONS: [&str; 2] = [
    "How much time can you dedicate to learning per week?",
    "What is your preferred learning style (hands-on, reading, video tutorials)?",
];

const LEARNING_CUES: [&str; 4] = ["learn", "teach me", "study", "get started with"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Python,
    MachineLearning,
    Web,
    General,
}

impl Subject {
    pub fn detect(request: &str) -> Self {
        let lower = request.to_lowercase();
        let has_word = |word: &str| {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|w| w == word)
        };

        if lower.contains("python") {
            Subject::Python
        } else if lower.contains("machine learning") || has_word("ml") {
            Subject::MachineLearning
        } else if lower.contains("web") {
            Subject::Web
        } else {
            Subject::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Python => "python",
            Subject::MachineLearning => "machine_learning",
            Subject::Web => "web",
            Subject::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreAssessment {
    pub subject: &'static str,
    pub questions: Vec<String>,
}

/// Whether a chat message reads like a request to start learning something.
pub fn is_learning_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    LEARNING_CUES.iter().any(|cue| lower.contains(cue))
}

fn template_questions(subject: Subject, request: &str) -> Vec<String> {
    match subject {
        Subject::Python => vec![
            "What is your current level of programming experience?".into(),
            "Have you used any programming languages before Python?".into(),
            "What specific Python applications interest you (web, data science, automation)?".into(),
            "Do you have any specific Python libraries or frameworks in mind?".into(),
        ],
        Subject::MachineLearning => vec![
            "What is your background in AI and statistics?".into(),
            "Have you worked with any ML frameworks before?".into(),
            "What specific ML applications interest you?".into(),
            "Are you familiar with Python, as it's commonly used in ML?".into(),
        ],
        Subject::Web => vec![
            "Are you more interested in frontend or backend development?".into(),
            "Have you worked with HTML, CSS, or JavaScript before?".into(),
            "Which web frameworks are you interested in learning?".into(),
            "Do you have experience with any web technologies?".into(),
        ],
        Subject::General => vec![
            format!("What is your current knowledge level in {}?", request.trim()),
            "What specific aspects of this subject interest you most?".into(),
            "How do you plan to apply this knowledge?".into(),
            "What learning resources have you tried before?".into(),
        ],
    }
}

fn with_common(mut questions: Vec<String>) -> Vec<String> {
    questions.extend(COMMON_QUESTIONS.iter().map(|q| q.to_string()));
    questions
}

fn require_request(request: &str) -> Result<()> {
    if request.trim().is_empty() {
        return Err(TutorError::Validation(ValidationErrors::single(
            "request",
            "learning request cannot be empty",
        )));
    }
    Ok(())
}

/// Template questions for a learning request, followed by the common ones.
pub fn questions_for(request: &str) -> Result<PreAssessment> {
    require_request(request)?;
    let subject = Subject::detect(request);
    debug!(subject = subject.as_str(), "using template questions");
    Ok(PreAssessment {
        subject: subject.as_str(),
        questions: with_common(template_questions(subject, request)),
    })
}

/// Pulls questions out of free text: one per line, list markers removed,
/// only lines ending in `?` kept.
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| "0123456789.- *".contains(c))
                .trim()
        })
        .filter(|line| !line.is_empty() && line.ends_with('?'))
        .map(String::from)
        .collect()
}

/// Uses generated questions when enough of them parse, templates otherwise.
pub fn questions_from_generated(request: &str, generated: &str) -> Result<PreAssessment> {
    require_request(request)?;
    let parsed = parse_questions(generated);
    if parsed.len() < MIN_GENERATED_QUESTIONS {
        warn!(parsed = parsed.len(), "too few generated questions, falling back to templates");
        return questions_for(request);
    }
    Ok(PreAssessment {
        subject: Subject::detect(request).as_str(),
        questions: with_common(parsed),
    })
}

// Wire types for /assessments

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub question_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<AssessmentQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSubmission {
    pub assessment_id: String,
    pub answers: BTreeMap<String, String>,
}

impl AssessmentSubmission {
    /// Builds a submission from `question=answer` pairs.
    pub fn from_pairs<'a, I>(assessment_id: &str, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut answers = BTreeMap::new();
        let mut errors = ValidationErrors::default();
        for pair in pairs {
            match pair.split_once('=') {
                Some((question, answer)) if !question.trim().is_empty() => {
                    answers.insert(question.trim().to_string(), answer.trim().to_string());
                }
                _ => errors.push(pair, "expected question=answer"),
            }
        }
        if answers.is_empty() && errors.is_empty() {
            errors.push("answers", "at least one answer is required");
        }
        errors.into_result()?;
        Ok(Self {
            assessment_id: assessment_id.to_string(),
            answers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub feedback: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod subject_tests {
        use super::*;

        #[test]
        fn detects_subjects() {
            assert_eq!(Subject::detect("I want to learn Python"), Subject::Python);
            assert_eq!(Subject::detect("Teach me machine learning"), Subject::MachineLearning);
            assert_eq!(Subject::detect("intro to ML please"), Subject::MachineLearning);
            assert_eq!(Subject::detect("web development"), Subject::Web);
            assert_eq!(Subject::detect("medieval history"), Subject::General);
        }

        #[test]
        fn ml_must_be_a_word() {
            assert_eq!(Subject::detect("learn html"), Subject::General);
        }

        #[test]
        fn learning_cues() {
            assert!(is_learning_request("I want to learn Rust"));
            assert!(is_learning_request("Teach me SQL"));
            assert!(!is_learning_request("what's the weather"));
        }
    }

    mod template_tests {
        use super::*;

        #[test]
        fn python_request_gets_python_questions_plus_common() {
            let pre = questions_for("I want to learn Python").unwrap();
            assert_eq!(pre.subject, "python");
            assert_eq!(pre.questions.len(), 6);
            assert!(pre.questions[1].contains("before Python"));
            assert_eq!(pre.questions[4], COMMON_QUESTIONS[0]);
            assert_eq!(pre.questions[5], COMMON_QUESTIONS[1]);
        }

        #[test]
        fn general_request_mentions_subject() {
            let pre = questions_for("  Ancient Greek ").unwrap();
            assert_eq!(pre.questions[0], "What is your current knowledge level in Ancient Greek?");
        }

        #[test]
        fn empty_request_is_rejected() {
            assert!(matches!(questions_for("   "), Err(TutorError::Validation(_))));
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn strips_markers_and_keeps_questions() {
            let text = "Here are some questions:\n\
                        1. Have you coded before?\n\
                        - What do you want to build?\n\
                        * Do you know Git?\n\
                        This line is not a question.\n\
                        \n\
                        12) Odd marker?";
            let parsed = parse_questions(text);
            assert_eq!(
                parsed,
                vec![
                    "Have you coded before?",
                    "What do you want to build?",
                    "Do you know Git?",
                    ") Odd marker?",
                ]
            );
        }

        #[test]
        fn generated_questions_win_when_enough() {
            let generated = "1. A?\n2. B?\n3. C?";
            let pre = questions_from_generated("learn rust", generated).unwrap();
            assert_eq!(pre.questions.len(), 5);
            assert_eq!(pre.questions[0], "A?");
        }

        #[test]
        fn falls_back_to_templates_when_too_few() {
            let pre = questions_from_generated("learn web stuff", "1. Only one?").unwrap();
            assert_eq!(pre.subject, "web");
            assert_eq!(pre.questions[0], "Are you more interested in frontend or backend development?");
        }
    }

    mod submission_tests {
        use super::*;

        #[test]
        fn builds_from_pairs() {
            let sub = AssessmentSubmission::from_pairs("a1", ["q1=yes", "q2 = no "]).unwrap();
            assert_eq!(sub.answers["q2"], "no");

            let json = serde_json::to_value(&sub).unwrap();
            assert_eq!(json["assessmentId"], "a1");
        }

        #[test]
        fn rejects_malformed_pairs() {
            let err = AssessmentSubmission::from_pairs("a1", ["q1"]).unwrap_err();
            assert!(err.to_string().contains("expected question=answer"));
        }

        #[test]
        fn requires_an_answer() {
            let empty: [&str; 0] = [];
            assert!(AssessmentSubmission::from_pairs("a1", empty).is_err());
        }
    }
}
