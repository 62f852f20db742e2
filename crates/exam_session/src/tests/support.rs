//! Recording fakes shared by the controller, state machine and runtime tests.

use std::{
    collections::{BTreeSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use exam_client::{AuthContext, ExamSource, GatewayError, SubmissionGateway};
use shared::{
    domain::ExamId,
    error::{ApiError, ErrorCode},
    protocol::{ExamDetail, QuestionPayload, SubmitExamRequest, SubmitExamResponse},
};

use crate::adapter::{HostEventSource, ListenerKind};
use crate::countdown::{CountdownHandle, CountdownScheduler};

pub fn sample_exam() -> ExamDetail {
    ExamDetail {
        id: ExamId::new("exam-1"),
        title: "Rust basics".into(),
        duration: 30,
        questions: vec![
            QuestionPayload {
                question: "Is safe Rust free of data races?".into(),
                options: vec!["yes".into(), "no".into()],
            },
            QuestionPayload {
                question: "May two &mut borrows alias?".into(),
                options: vec!["yes".into(), "no".into()],
            },
        ],
        created_at: None,
    }
}

#[derive(Default)]
struct HostLog {
    active: BTreeSet<ListenerKind>,
    added: usize,
    removed: usize,
}

#[derive(Clone, Default)]
pub struct RecordingHost {
    log: Arc<Mutex<HostLog>>,
}

impl RecordingHost {
    pub fn active(&self) -> Vec<ListenerKind> {
        self.log.lock().expect("host log").active.iter().copied().collect()
    }

    pub fn added(&self) -> usize {
        self.log.lock().expect("host log").added
    }

    pub fn removed(&self) -> usize {
        self.log.lock().expect("host log").removed
    }
}

impl HostEventSource for RecordingHost {
    fn add_listener(&mut self, kind: ListenerKind) {
        let mut log = self.log.lock().expect("host log");
        log.active.insert(kind);
        log.added += 1;
    }

    fn remove_listener(&mut self, kind: ListenerKind) {
        let mut log = self.log.lock().expect("host log");
        log.active.remove(&kind);
        log.removed += 1;
    }
}

#[derive(Default)]
struct SchedulerLog {
    next_id: u64,
    scheduled: Vec<(CountdownHandle, Duration)>,
    cancelled: Vec<CountdownHandle>,
    cancel_calls: usize,
}

/// Scheduler whose ticks are delivered by the test itself.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    log: Arc<Mutex<SchedulerLog>>,
}

impl ManualScheduler {
    pub fn last_scheduled(&self) -> Option<CountdownHandle> {
        self.log
            .lock()
            .expect("scheduler log")
            .scheduled
            .last()
            .map(|(handle, _)| *handle)
    }

    pub fn scheduled(&self) -> usize {
        self.log.lock().expect("scheduler log").scheduled.len()
    }

    pub fn period(&self, handle: CountdownHandle) -> Option<Duration> {
        self.log
            .lock()
            .expect("scheduler log")
            .scheduled
            .iter()
            .find(|(candidate, _)| *candidate == handle)
            .map(|(_, period)| *period)
    }

    pub fn is_cancelled(&self, handle: CountdownHandle) -> bool {
        self.log
            .lock()
            .expect("scheduler log")
            .cancelled
            .contains(&handle)
    }

    pub fn cancel_calls(&self) -> usize {
        self.log.lock().expect("scheduler log").cancel_calls
    }

    /// A handle nobody is waiting on.
    pub fn schedule_detached(&self) -> CountdownHandle {
        let mut log = self.log.lock().expect("scheduler log");
        log.next_id += 1;
        CountdownHandle::new(1_000 + log.next_id)
    }
}

impl CountdownScheduler for ManualScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> CountdownHandle {
        let mut log = self.log.lock().expect("scheduler log");
        log.next_id += 1;
        let handle = CountdownHandle::new(log.next_id);
        log.scheduled.push((handle, period));
        handle
    }

    fn cancel(&mut self, handle: CountdownHandle) {
        let mut log = self.log.lock().expect("scheduler log");
        log.cancel_calls += 1;
        if !log.cancelled.contains(&handle) {
            log.cancelled.push(handle);
        }
    }
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Accept,
    Reject { status: u16, message: String },
    Transport,
}

impl Scripted {
    fn into_result(self) -> Result<SubmitExamResponse, GatewayError> {
        match self {
            Scripted::Accept => Ok(SubmitExamResponse {
                message: Some("Exam submitted".into()),
            }),
            Scripted::Reject { status, message } => Err(GatewayError::rejected(
                status,
                ApiError::new(ErrorCode::Unknown, message),
            )),
            Scripted::Transport => Err(GatewayError::Transport("connection refused".into())),
        }
    }
}

#[derive(Default)]
struct GatewayLog {
    requests: Vec<SubmitExamRequest>,
    script: VecDeque<Scripted>,
}

/// Records every submission; answers from a script, accepting once the
/// script runs out.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    log: Arc<Mutex<GatewayLog>>,
}

impl RecordingGateway {
    pub fn scripted(script: impl IntoIterator<Item = Scripted>) -> Self {
        let gateway = Self::default();
        gateway
            .log
            .lock()
            .expect("gateway log")
            .script
            .extend(script);
        gateway
    }

    pub fn requests(&self) -> Vec<SubmitExamRequest> {
        self.log.lock().expect("gateway log").requests.clone()
    }

    pub fn calls(&self) -> usize {
        self.log.lock().expect("gateway log").requests.len()
    }
}

#[async_trait]
impl SubmissionGateway for RecordingGateway {
    async fn submit(
        &self,
        _auth: &AuthContext,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, GatewayError> {
        let next = {
            let mut log = self.log.lock().expect("gateway log");
            log.requests.push(request.clone());
            log.script.pop_front().unwrap_or(Scripted::Accept)
        };
        next.into_result()
    }
}

pub struct StaticExamSource {
    detail: Option<ExamDetail>,
    reject: Option<(u16, String)>,
}

impl StaticExamSource {
    pub fn ok(detail: ExamDetail) -> Self {
        Self {
            detail: Some(detail),
            reject: None,
        }
    }

    pub fn rejecting(status: u16, message: impl Into<String>) -> Self {
        Self {
            detail: None,
            reject: Some((status, message.into())),
        }
    }
}

#[async_trait]
impl ExamSource for StaticExamSource {
    async fn fetch_exam(
        &self,
        _auth: &AuthContext,
        _exam_id: &ExamId,
    ) -> Result<ExamDetail, GatewayError> {
        match (&self.detail, &self.reject) {
            (Some(detail), _) => Ok(detail.clone()),
            (None, Some((status, message))) => Err(GatewayError::rejected(
                *status,
                ApiError::new(ErrorCode::Unknown, message.clone()),
            )),
            (None, None) => Err(GatewayError::Transport("no exam configured".into())),
        }
    }
}
