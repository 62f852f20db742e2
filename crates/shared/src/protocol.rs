use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ExamId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub question: String,
    pub options: Vec<String>,
}

/// Exam as served by `GET /api/exams/{id}`. `duration` is in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamDetail {
    #[serde(rename = "_id", alias = "id")]
    pub id: ExamId,
    pub title: String,
    pub duration: u32,
    pub questions: Vec<QuestionPayload>,
    #[serde(
        default,
        rename = "createdAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/exams/submit`. `duration` is in seconds and
/// `tab_switches` is only present for auto-submitted attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub exam_id: ExamId,
    pub answers: Vec<String>,
    pub duration: u64,
    pub auto_submitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_switches: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitExamResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_submission_omits_tab_switches() {
        let request = SubmitExamRequest {
            exam_id: ExamId::new("exam-1"),
            answers: vec!["A".into(), String::new()],
            duration: 42,
            auto_submitted: false,
            tab_switches: None,
        };
        let value = serde_json::to_value(&request).expect("json");
        assert_eq!(
            value,
            serde_json::json!({
                "examId": "exam-1",
                "answers": ["A", ""],
                "duration": 42,
                "autoSubmitted": false
            })
        );
    }

    #[test]
    fn exam_detail_accepts_mongo_style_id() {
        let exam: ExamDetail = serde_json::from_str(
            r#"{
                "_id": "65f0",
                "title": "Rust basics",
                "duration": 30,
                "questions": [{"question": "2+2?", "options": ["3", "4"]}],
                "createdBy": "someone"
            }"#,
        )
        .expect("parse");
        assert_eq!(exam.id, ExamId::new("65f0"));
        assert_eq!(exam.questions[0].options, vec!["3", "4"]);
        assert!(exam.created_at.is_none());
    }
}
