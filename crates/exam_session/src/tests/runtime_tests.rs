use super::*;
use std::sync::Arc;

use exam_client::AuthContext;
use shared::domain::Role;
use tokio::task::JoinHandle;

use crate::controller::{ControllerOptions, SessionDeps};
use crate::countdown::TokioCountdownScheduler;
use crate::session::{ExamSession, SubmitTrigger};
use crate::tests::support::{sample_exam, RecordingGateway, RecordingHost};
use crate::view::StatusLevel;

struct Running {
    inputs: mpsc::Sender<SessionInput>,
    views: watch::Receiver<SessionView>,
    task: JoinHandle<SessionExit>,
    host: RecordingHost,
    gateway: RecordingGateway,
}

fn start_session() -> Running {
    let host = RecordingHost::default();
    let gateway = RecordingGateway::default();
    let (scheduler, ticks) = TokioCountdownScheduler::new();
    let session = ExamSession::from_detail(sample_exam(), Role::Student).expect("valid exam");
    let controller = ExamSessionController::new(
        session,
        AuthContext::new("token", Role::Student),
        SessionDeps {
            host: Box::new(host.clone()),
            scheduler: Box::new(scheduler),
            gateway: Arc::new(gateway.clone()),
        },
        ControllerOptions::default(),
    );
    let (inputs, input_rx) = mpsc::channel(16);
    let (runtime, views) = SessionRuntime::new(controller, input_rx, ticks);
    Running {
        inputs,
        views,
        task: tokio::spawn(runtime.run()),
        host,
        gateway,
    }
}

async fn hide_tab(running: &Running) {
    running
        .inputs
        .send(SessionInput::Signal(HostSignal::VisibilityChanged { hidden: true }))
        .await
        .expect("runtime alive");
}

#[tokio::test(start_paused = true)]
async fn budget_exhaustion_counts_down_and_leaves_for_results() {
    let mut running = start_session();
    assert_eq!(running.host.active().len(), 6);
    for _ in 0..3 {
        hide_tab(&running).await;
    }

    running
        .views
        .wait_for(|view| view.show_auto_submit_notice())
        .await
        .expect("grace period shown");

    let exit = running.task.await.expect("runtime task");
    assert_eq!(exit.state, SessionState::Submitted);
    assert_eq!(exit.navigation, Some(NavigationTarget::Results));
    let payload = exit.submitted.expect("payload");
    assert_eq!(payload.trigger(), SubmitTrigger::ViolationBudget);
    assert_eq!(payload.tab_switches(), Some(3));
    assert_eq!(payload.duration_secs(), 10);

    assert_eq!(running.gateway.calls(), 1);
    assert!(running.host.active().is_empty());
    let last = running.views.borrow().clone();
    assert!(!last.show_auto_submit_notice());
    assert_eq!(last.status.map(|status| status.level), Some(StatusLevel::Info));
}

#[tokio::test(start_paused = true)]
async fn manual_submit_leaves_for_results() {
    let running = start_session();
    running
        .inputs
        .send(SessionInput::SelectAnswer {
            question: 0,
            option: "yes".into(),
        })
        .await
        .expect("runtime alive");
    running
        .inputs
        .send(SessionInput::Submit)
        .await
        .expect("runtime alive");

    let exit = running.task.await.expect("runtime task");
    assert_eq!(exit.state, SessionState::ManualSubmitted);
    assert_eq!(exit.navigation, Some(NavigationTarget::Results));
    let requests = running.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].answers, vec!["yes", ""]);
    assert!(running.host.active().is_empty());
}

#[tokio::test(start_paused = true)]
async fn host_hangup_tears_the_session_down() {
    let running = start_session();
    hide_tab(&running).await;
    drop(running.inputs);

    let exit = running.task.await.expect("runtime task");
    assert_eq!(exit.state, SessionState::Monitoring);
    assert_eq!(exit.navigation, None);
    assert!(exit.submitted.is_none());
    assert!(running.host.active().is_empty());
    assert_eq!(running.gateway.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn hangup_during_grace_period_cancels_the_countdown() {
    let mut running = start_session();
    for _ in 0..3 {
        hide_tab(&running).await;
    }
    running
        .views
        .wait_for(|view| view.seconds_left().is_some())
        .await
        .expect("grace period shown");
    drop(running.inputs);

    let exit = running.task.await.expect("runtime task");
    assert!(matches!(exit.state, SessionState::GracePeriod { .. }));
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(running.gateway.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_answer_surfaces_as_error_status() {
    let mut running = start_session();
    running
        .inputs
        .send(SessionInput::SelectAnswer {
            question: 5,
            option: "yes".into(),
        })
        .await
        .expect("runtime alive");

    let status = running
        .views
        .wait_for(|view| view.status.is_some())
        .await
        .expect("status shown")
        .status
        .clone()
        .expect("status");
    assert_eq!(status.level, StatusLevel::Error);
    assert!(status.text.contains("question 5"));

    drop(running.inputs);
    running.task.await.expect("runtime task");
}

#[tokio::test(start_paused = true)]
async fn submit_during_grace_period_is_refused() {
    let mut running = start_session();
    for _ in 0..3 {
        hide_tab(&running).await;
    }
    running
        .inputs
        .send(SessionInput::Submit)
        .await
        .expect("runtime alive");

    let status = running
        .views
        .wait_for(|view| view.status.is_some())
        .await
        .expect("status shown")
        .status
        .clone()
        .expect("status");
    assert_eq!(status.level, StatusLevel::Error);

    let exit = running.task.await.expect("runtime task");
    assert_eq!(exit.state, SessionState::Submitted);
    let requests = running.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].auto_submitted);
}
