use std::time::Duration;

use exam_client::{AuthContext, ExamSource};
use shared::{
    domain::{AttemptId, ExamId, Role},
    protocol::{ExamDetail, SubmitExamRequest},
};
use tracing::{info, warn};

use crate::error::{AnswerError, SessionLoadError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
}

/// One candidate attempt at one exam.
#[derive(Debug, Clone)]
pub struct ExamSession {
    attempt_id: AttemptId,
    exam_id: ExamId,
    title: String,
    duration: Duration,
    questions: Vec<Question>,
    answers: Vec<Option<String>>,
    role: Role,
}

impl ExamSession {
    pub fn from_detail(detail: ExamDetail, role: Role) -> Result<Self, SessionLoadError> {
        if detail.id.as_str().trim().is_empty() {
            return Err(SessionLoadError::Malformed("exam id is empty".into()));
        }
        if detail.duration == 0 {
            return Err(SessionLoadError::Malformed(format!(
                "exam {} has no duration",
                detail.id
            )));
        }
        if detail.questions.is_empty() {
            return Err(SessionLoadError::Malformed(format!(
                "exam {} has no questions",
                detail.id
            )));
        }
        let mut questions = Vec::with_capacity(detail.questions.len());
        for (index, question) in detail.questions.into_iter().enumerate() {
            if question.options.is_empty() {
                return Err(SessionLoadError::Malformed(format!(
                    "question {index} of exam {} has no options",
                    detail.id
                )));
            }
            questions.push(Question {
                prompt: question.question,
                options: question.options,
            });
        }

        Ok(Self {
            attempt_id: AttemptId::generate(),
            answers: vec![None; questions.len()],
            exam_id: detail.id,
            title: detail.title,
            duration: Duration::from_secs(u64::from(detail.duration) * 60),
            questions,
            role,
        })
    }

    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn select_answer(&mut self, index: usize, option: &str) -> Result<(), AnswerError> {
        let count = self.questions.len();
        let question = self
            .questions
            .get(index)
            .ok_or(AnswerError::NoSuchQuestion { index, count })?;
        if !question.options.iter().any(|candidate| candidate == option) {
            return Err(AnswerError::NoSuchOption {
                index,
                option: option.to_string(),
            });
        }
        self.answers[index] = Some(option.to_string());
        Ok(())
    }

    /// Answers in wire form: unanswered slots become empty strings.
    pub fn answer_sheet(&self) -> Vec<String> {
        self.answers
            .iter()
            .map(|answer| answer.clone().unwrap_or_default())
            .collect()
    }
}

pub async fn load_session(
    source: &dyn ExamSource,
    auth: &AuthContext,
    exam_id: &ExamId,
) -> Result<ExamSession, SessionLoadError> {
    let detail = source.fetch_exam(auth, exam_id).await.map_err(|err| {
        warn!(exam_id = %exam_id, error = %err, "exam load failed");
        SessionLoadError::from(err)
    })?;
    if &detail.id != exam_id {
        return Err(SessionLoadError::Malformed(format!(
            "requested exam {exam_id} but received {}",
            detail.id
        )));
    }
    let session = ExamSession::from_detail(detail, auth.role)?;
    info!(
        exam_id = %session.exam_id,
        attempt_id = %session.attempt_id,
        role = auth.role.as_str(),
        questions = session.questions.len(),
        "exam session loaded"
    );
    Ok(session)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    ViolationBudget,
    TimeLimit,
}

/// The final answer set of an attempt. Built once per terminal transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    exam_id: ExamId,
    answers: Vec<String>,
    duration_secs: u64,
    trigger: SubmitTrigger,
    violations: u32,
}

impl SubmissionPayload {
    pub fn new(
        session: &ExamSession,
        duration_secs: u64,
        trigger: SubmitTrigger,
        violations: u32,
    ) -> Self {
        Self {
            exam_id: session.exam_id.clone(),
            answers: session.answer_sheet(),
            duration_secs,
            trigger,
            violations,
        }
    }

    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn trigger(&self) -> SubmitTrigger {
        self.trigger
    }

    pub fn auto_submitted(&self) -> bool {
        self.trigger != SubmitTrigger::Manual
    }

    /// Violation count attached to automatic submissions only.
    pub fn tab_switches(&self) -> Option<u32> {
        self.auto_submitted().then_some(self.violations)
    }

    pub fn to_request(&self) -> SubmitExamRequest {
        SubmitExamRequest {
            exam_id: self.exam_id.clone(),
            answers: self.answers.clone(),
            duration: self.duration_secs,
            auto_submitted: self.auto_submitted(),
            tab_switches: self.tab_switches(),
        }
    }
}
