//! Open assessment attempts
//!
//! An attempt collects answers keyed by question id until it is closed,
//! either by the user submitting or by its deadline passing. Closing is a
//! one-shot transition: whichever side closes first owns the submission and
//! the other sees `AttemptClosed`.
//!
//! Slots do not live forever. A finished attempt is dropped once its
//! outcome has been read or its retention has passed, and an untimed
//! attempt left idle past `idle_timeout` is discarded without submitting.
//! Stale slots are swept whenever a new attempt opens.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::AttemptConfig;
use crate::domain::{Assessment, QuestionId, UserAnswer};
use crate::errors::{AppError, Result};

/// What the client needs to start answering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub attempt_id: Uuid,
    pub study_material_id: Uuid,
    pub assessment: Assessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AttemptStatus {
    #[serde(rename_all = "camelCase")]
    Open {
        deadline: Option<DateTime<Utc>>,
        answered: usize,
        total: usize,
    },
    Submitting,
    #[serde(rename_all = "camelCase")]
    Completed { test_id: Uuid },
    Failed { message: String },
}

/// An attempt taken out of the registry for submission
#[derive(Debug, Clone)]
pub struct ClosedAttempt {
    pub attempt_id: Uuid,
    pub user_id: String,
    pub study_material_id: Uuid,
    pub assessment: Assessment,
    /// Answers in question order; unanswered questions are absent
    pub answers: Vec<UserAnswer>,
}

struct OpenAttempt {
    study_material_id: Uuid,
    assessment: Assessment,
    answers: HashMap<QuestionId, String>,
    deadline: Option<(Instant, DateTime<Utc>)>,
    watcher: Option<JoinHandle<()>>,
}

impl OpenAttempt {
    fn expired(&self) -> bool {
        self.deadline
            .is_some_and(|(instant, _)| Instant::now() >= instant)
    }

    fn into_closed(self, attempt_id: Uuid, user_id: String) -> ClosedAttempt {
        let mut answers = self.answers;
        let answers = self
            .assessment
            .questions
            .iter()
            .filter_map(|q| {
                answers.remove(&q.id).map(|answer| UserAnswer {
                    question_id: q.id,
                    answer,
                })
            })
            .collect();

        ClosedAttempt {
            attempt_id,
            user_id,
            study_material_id: self.study_material_id,
            assessment: self.assessment,
            answers,
        }
    }
}

enum Phase {
    Open(OpenAttempt),
    Closed(Option<std::result::Result<Uuid, String>>),
}

struct Slot {
    user_id: String,
    phase: Phase,
    /// Last answer for open attempts, completion time for closed ones
    touched: Instant,
}

impl Slot {
    fn is_stale(&self, limits: &AttemptLimits) -> bool {
        match &self.phase {
            // Timed attempts are closed by their watcher
            Phase::Open(open) if open.deadline.is_some() => false,
            Phase::Open(_) => self.touched.elapsed() >= limits.idle_timeout,
            // Submission still running
            Phase::Closed(None) => false,
            Phase::Closed(Some(_)) => self.touched.elapsed() >= limits.retention,
        }
    }
}

/// How long slots may stay in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptLimits {
    pub idle_timeout: Duration,
    pub retention: Duration,
}

impl From<&AttemptConfig> for AttemptLimits {
    fn from(config: &AttemptConfig) -> Self {
        Self {
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            retention: Duration::from_secs(config.retention_secs),
        }
    }
}

impl Default for AttemptLimits {
    fn default() -> Self {
        Self::from(&AttemptConfig::default())
    }
}

#[derive(Clone, Default)]
pub struct AttemptRegistry {
    slots: Arc<Mutex<HashMap<Uuid, Slot>>>,
    limits: AttemptLimits,
}

impl AttemptRegistry {
    pub fn new(limits: AttemptLimits) -> Self {
        Self {
            slots: Arc::default(),
            limits,
        }
    }

    /// Register an attempt. When the assessment is timed, a watcher closes
    /// it at the deadline and hands it to `on_expire`, whose outcome is
    /// remembered for [`status`](Self::status).
    pub async fn open<F, Fut>(
        &self,
        user_id: &str,
        study_material_id: Uuid,
        assessment: Assessment,
        on_expire: F,
    ) -> AttemptView
    where
        F: FnOnce(ClosedAttempt) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Uuid>> + Send + 'static,
    {
        let attempt_id = Uuid::new_v4();
        let deadline = assessment.time_limit_minutes().map(|minutes| {
            let limit = Duration::from_secs(u64::from(minutes) * 60);
            let wall = Utc::now() + chrono::Duration::seconds(i64::from(minutes) * 60);
            (Instant::now() + limit, wall)
        });

        let mut slots = self.slots.lock().await;
        sweep(&mut slots, &self.limits);
        let watcher = deadline.map(|(instant, _)| {
            let registry = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep_until(instant).await;
                let Some(closed) = registry.take_open(attempt_id).await else {
                    return;
                };
                tracing::info!(
                    attempt_id = %attempt_id,
                    answered = closed.answers.len(),
                    "Attempt deadline reached, auto-submitting"
                );
                let outcome = on_expire(closed).await;
                registry.complete(attempt_id, &outcome).await;
            })
        });

        slots.insert(
            attempt_id,
            Slot {
                user_id: user_id.to_string(),
                touched: Instant::now(),
                phase: Phase::Open(OpenAttempt {
                    study_material_id,
                    assessment: assessment.clone(),
                    answers: HashMap::new(),
                    deadline,
                    watcher,
                }),
            },
        );

        AttemptView {
            attempt_id,
            study_material_id,
            assessment,
            deadline: deadline.map(|(_, wall)| wall),
        }
    }

    /// Store or replace the answer to one question
    pub async fn record_answer(
        &self,
        user_id: &str,
        attempt_id: Uuid,
        question_id: QuestionId,
        answer: String,
    ) -> Result<()> {
        let mut slots = self.slots.lock().await;
        let slot = owned_slot(&mut slots, user_id, attempt_id)?;
        let Phase::Open(open) = &mut slot.phase else {
            return Err(closed(attempt_id));
        };
        if open.expired() {
            return Err(closed(attempt_id));
        }
        if !open.assessment.contains(&question_id) {
            return Err(AppError::validation(
                "questionId",
                format!("Question {} is not part of this assessment.", question_id),
            ));
        }

        open.answers.insert(question_id, answer);
        slot.touched = Instant::now();
        Ok(())
    }

    /// Close the attempt for a manual submit. Fails with `AttemptClosed` if
    /// the deadline watcher or another submit got there first.
    pub async fn close(&self, user_id: &str, attempt_id: Uuid) -> Result<ClosedAttempt> {
        let mut slots = self.slots.lock().await;
        let slot = owned_slot(&mut slots, user_id, attempt_id)?;
        match std::mem::replace(&mut slot.phase, Phase::Closed(None)) {
            Phase::Open(open) => {
                if let Some(watcher) = &open.watcher {
                    watcher.abort();
                }
                Ok(open.into_closed(attempt_id, slot.user_id.clone()))
            }
            done @ Phase::Closed(_) => {
                slot.phase = done;
                Err(closed(attempt_id))
            }
        }
    }

    /// Record how a closed attempt's submission ended
    pub async fn complete<E: std::fmt::Display>(
        &self,
        attempt_id: Uuid,
        outcome: &std::result::Result<Uuid, E>,
    ) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(&attempt_id) {
            slot.phase = Phase::Closed(Some(match outcome {
                Ok(test_id) => Ok(*test_id),
                Err(err) => Err(err.to_string()),
            }));
            slot.touched = Instant::now();
        }
    }

    /// Current state of an attempt. Reading a finished outcome releases
    /// the slot, so later lookups answer `AttemptNotFound`.
    pub async fn status(&self, user_id: &str, attempt_id: Uuid) -> Result<AttemptStatus> {
        let mut slots = self.slots.lock().await;
        let slot = owned_slot(&mut slots, user_id, attempt_id)?;
        let status = match &slot.phase {
            Phase::Open(open) if open.expired() => AttemptStatus::Submitting,
            Phase::Open(open) => AttemptStatus::Open {
                deadline: open.deadline.map(|(_, wall)| wall),
                answered: open.answers.len(),
                total: open.assessment.questions.len(),
            },
            Phase::Closed(None) => AttemptStatus::Submitting,
            Phase::Closed(Some(Ok(test_id))) => AttemptStatus::Completed { test_id: *test_id },
            Phase::Closed(Some(Err(message))) => AttemptStatus::Failed {
                message: message.clone(),
            },
        };

        if matches!(
            status,
            AttemptStatus::Completed { .. } | AttemptStatus::Failed { .. }
        ) {
            slots.remove(&attempt_id);
        }
        Ok(status)
    }

    /// Deadline path of [`close`](Self::close); `None` if already closed
    async fn take_open(&self, attempt_id: Uuid) -> Option<ClosedAttempt> {
        let mut slots = self.slots.lock().await;
        let slot = slots.get_mut(&attempt_id)?;
        match std::mem::replace(&mut slot.phase, Phase::Closed(None)) {
            Phase::Open(open) => Some(open.into_closed(attempt_id, slot.user_id.clone())),
            done @ Phase::Closed(_) => {
                slot.phase = done;
                None
            }
        }
    }
}

fn owned_slot<'a>(
    slots: &'a mut HashMap<Uuid, Slot>,
    user_id: &str,
    attempt_id: Uuid,
) -> Result<&'a mut Slot> {
    slots
        .get_mut(&attempt_id)
        .filter(|slot| slot.user_id == user_id)
        .ok_or_else(|| AppError::AttemptNotFound {
            id: attempt_id.to_string(),
        })
}

fn sweep(slots: &mut HashMap<Uuid, Slot>, limits: &AttemptLimits) {
    let before = slots.len();
    slots.retain(|_, slot| !slot.is_stale(limits));
    let evicted = before - slots.len();
    if evicted > 0 {
        tracing::debug!(evicted, remaining = slots.len(), "Swept stale attempts");
    }
}

fn closed(attempt_id: Uuid) -> AppError {
    AppError::AttemptClosed {
        id: attempt_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Question, QuestionType};
    use tokio::sync::oneshot;

    fn assessment(timer: Option<u32>) -> Assessment {
        let question = |text: &str| Question {
            id: QuestionId::new(),
            question_text: text.into(),
            question_type: QuestionType::ShortAnswer,
            options: None,
            correct_answer: "answer".into(),
            explanation: "because".into(),
        };
        Assessment {
            questions: vec![question("first"), question("second")],
            timer,
        }
    }

    async fn never_expires(_: ClosedAttempt) -> Result<Uuid> {
        Ok(Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_answers_collected_in_question_order() {
        let registry = AttemptRegistry::default();
        let view = registry
            .open("alice", Uuid::new_v4(), assessment(None), never_expires)
            .await;
        assert!(view.deadline.is_none());
        let q = &view.assessment.questions;

        registry
            .record_answer("alice", view.attempt_id, q[1].id, "late".into())
            .await
            .unwrap();
        registry
            .record_answer("alice", view.attempt_id, q[0].id, "draft".into())
            .await
            .unwrap();
        registry
            .record_answer("alice", view.attempt_id, q[0].id, "final".into())
            .await
            .unwrap();

        let closed = registry.close("alice", view.attempt_id).await.unwrap();
        assert_eq!(
            closed.answers,
            vec![
                UserAnswer { question_id: q[0].id, answer: "final".into() },
                UserAnswer { question_id: q[1].id, answer: "late".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_question_and_foreign_user_rejected() {
        let registry = AttemptRegistry::default();
        let view = registry
            .open("alice", Uuid::new_v4(), assessment(None), never_expires)
            .await;

        let err = registry
            .record_answer("alice", view.attempt_id, QuestionId::new(), "x".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = registry
            .record_answer("bob", view.attempt_id, view.assessment.questions[0].id, "x".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AttemptNotFound { .. }));
        assert!(registry.status("bob", view.attempt_id).await.is_err());
    }

    #[tokio::test]
    async fn test_second_close_loses() {
        let registry = AttemptRegistry::default();
        let view = registry
            .open("alice", Uuid::new_v4(), assessment(None), never_expires)
            .await;

        registry.close("alice", view.attempt_id).await.unwrap();
        let err = registry.close("alice", view.attempt_id).await.unwrap_err();
        assert!(matches!(err, AppError::AttemptClosed { .. }));

        let err = registry
            .record_answer("alice", view.attempt_id, view.assessment.questions[0].id, "x".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AttemptClosed { .. }));
        assert_eq!(
            registry.status("alice", view.attempt_id).await.unwrap(),
            AttemptStatus::Submitting
        );

        let test_id = Uuid::new_v4();
        registry.complete::<String>(view.attempt_id, &Ok(test_id)).await;
        assert_eq!(
            registry.status("alice", view.attempt_id).await.unwrap(),
            AttemptStatus::Completed { test_id }
        );
    }

    #[tokio::test]
    async fn test_finished_outcome_released_after_read() {
        let registry = AttemptRegistry::default();
        let view = registry
            .open("alice", Uuid::new_v4(), assessment(None), never_expires)
            .await;
        registry.close("alice", view.attempt_id).await.unwrap();
        registry
            .complete(view.attempt_id, &Err::<Uuid, _>("Failed to evaluate AI assessment."))
            .await;

        assert_eq!(
            registry.status("alice", view.attempt_id).await.unwrap(),
            AttemptStatus::Failed {
                message: "Failed to evaluate AI assessment.".into()
            }
        );
        let err = registry.status("alice", view.attempt_id).await.unwrap_err();
        assert!(matches!(err, AppError::AttemptNotFound { .. }));
        assert!(registry.slots.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_slots_swept_on_open() {
        let registry = AttemptRegistry::new(AttemptLimits {
            idle_timeout: Duration::from_secs(600),
            retention: Duration::from_secs(60),
        });
        let idle = registry
            .open("alice", Uuid::new_v4(), assessment(None), never_expires)
            .await;
        let active = registry
            .open("alice", Uuid::new_v4(), assessment(None), never_expires)
            .await;
        let finished = registry
            .open("alice", Uuid::new_v4(), assessment(None), never_expires)
            .await;
        registry.close("alice", finished.attempt_id).await.unwrap();
        registry.complete(finished.attempt_id, &Ok::<_, String>(Uuid::new_v4())).await;

        tokio::time::sleep(Duration::from_secs(500)).await;
        registry
            .record_answer("alice", active.attempt_id, active.assessment.questions[0].id, "x".into())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(200)).await;

        registry
            .open("bob", Uuid::new_v4(), assessment(None), never_expires)
            .await;
        assert!(matches!(
            registry.status("alice", idle.attempt_id).await,
            Err(AppError::AttemptNotFound { .. })
        ));
        assert!(matches!(
            registry.status("alice", finished.attempt_id).await,
            Err(AppError::AttemptNotFound { .. })
        ));
        assert!(matches!(
            registry.status("alice", active.attempt_id).await,
            Ok(AttemptStatus::Open { answered: 1, .. })
        ));
        assert_eq!(registry.slots.lock().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_auto_submits_existing_answers() {
        let registry = AttemptRegistry::default();
        let (tx, rx) = oneshot::channel();
        let test_id = Uuid::new_v4();

        let view = registry
            .open("alice", Uuid::new_v4(), assessment(Some(1)), move |closed| async move {
                let _ = tx.send(closed.answers);
                Ok(test_id)
            })
            .await;
        assert!(view.deadline.is_some());
        let first = view.assessment.questions[0].id;
        registry
            .record_answer("alice", view.attempt_id, first, "partial".into())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        let submitted = rx.await.unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].question_id, first);

        let err = registry.close("alice", view.attempt_id).await.unwrap_err();
        assert!(matches!(err, AppError::AttemptClosed { .. }));

        let mut status = registry.status("alice", view.attempt_id).await.unwrap();
        for _ in 0..100 {
            if status != AttemptStatus::Submitting {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = registry.status("alice", view.attempt_id).await.unwrap();
        }
        assert_eq!(status, AttemptStatus::Completed { test_id });
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_submit_cancels_watcher() {
        let registry = AttemptRegistry::default();
        let (tx, mut rx) = oneshot::channel::<()>();

        let view = registry
            .open("alice", Uuid::new_v4(), assessment(Some(1)), move |_| async move {
                let _ = tx.send(());
                Ok(Uuid::new_v4())
            })
            .await;

        registry.close("alice", view.attempt_id).await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_after_deadline_rejected() {
        let registry = AttemptRegistry::default();
        let (hold, release) = oneshot::channel::<()>();
        let view = registry
            .open("alice", Uuid::new_v4(), assessment(Some(1)), move |_| async move {
                let _ = release.await;
                Ok(Uuid::new_v4())
            })
            .await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        let err = registry
            .record_answer("alice", view.attempt_id, view.assessment.questions[0].id, "x".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AttemptClosed { .. }));
        drop(hold);
    }
}
