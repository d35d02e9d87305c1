//! Scripted session double.
//!
//! Each session replays one script per `query`, in order. Everything the
//! orchestrator does to a session is appended to a shared [`SessionLog`] so
//! tests can assert on ordering across phases and sessions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{AgentSession, SessionFactory, SessionOptions};
use crate::errors::SessionError;
use crate::event::ToolResponse;
use crate::permission::PermissionDecision;
use crate::stream::RawEvent;

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Event(RawEvent),
    /// Never yields; used to exercise cancellation.
    Hang,
    /// `next_event` fails with a runtime error.
    Error(String),
}

impl From<RawEvent> for ScriptStep {
    fn from(raw: RawEvent) -> Self {
        ScriptStep::Event(raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionLogEntry {
    Opened { domain: String },
    Query { prompt: String },
    Pulled { frame_type: Option<String> },
    Responded { request_id: String, decision: PermissionDecision },
    Closed,
}

#[derive(Debug, Default)]
struct LogInner {
    entries: Vec<SessionLogEntry>,
    options: Vec<SessionOptions>,
}

/// Shared record of every session opened by a factory.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    inner: Arc<Mutex<LogInner>>,
}

impl SessionLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, entry: SessionLogEntry) {
        self.lock().entries.push(entry);
    }

    pub fn entries(&self) -> Vec<SessionLogEntry> {
        self.lock().entries.clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .filter_map(|e| match e {
                SessionLogEntry::Query { prompt } => Some(prompt.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn responses(&self) -> Vec<(String, PermissionDecision)> {
        self.lock()
            .entries
            .iter()
            .filter_map(|e| match e {
                SessionLogEntry::Responded {
                    request_id,
                    decision,
                } => Some((request_id.clone(), *decision)),
                _ => None,
            })
            .collect()
    }

    pub fn opened(&self) -> usize {
        self.count(|e| matches!(e, SessionLogEntry::Opened { .. }))
    }

    pub fn closed(&self) -> usize {
        self.count(|e| matches!(e, SessionLogEntry::Closed))
    }

    /// Options passed to each `open`, in order.
    pub fn options(&self) -> Vec<SessionOptions> {
        self.lock().options.clone()
    }

    fn count(&self, pred: impl Fn(&SessionLogEntry) -> bool) -> usize {
        self.lock().entries.iter().filter(|e| pred(e)).count()
    }
}

/// Opens sessions that replay the same scripts.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSessionFactory {
    scripts: Vec<Vec<ScriptStep>>,
    log: SessionLog,
    fail_open: bool,
}

impl ScriptedSessionFactory {
    /// One script per expected query.
    pub fn new(scripts: Vec<Vec<ScriptStep>>) -> Self {
        Self {
            scripts,
            log: SessionLog::default(),
            fail_open: false,
        }
    }

    /// A factory whose `open` always fails.
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn log(&self) -> SessionLog {
        self.log.clone()
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn AgentSession>, SessionError> {
        if self.fail_open {
            return Err(SessionError::Runtime("scripted runtime refused to start".into()));
        }
        {
            let mut log = self.log.lock();
            log.options.push(options.clone());
            log.entries.push(SessionLogEntry::Opened {
                domain: options.domain.clone(),
            });
        }
        Ok(Box::new(ScriptedSession {
            scripts: self.scripts.iter().cloned().map(VecDeque::from).collect(),
            current: None,
            log: self.log.clone(),
            closed: false,
        }))
    }
}

pub struct ScriptedSession {
    scripts: VecDeque<VecDeque<ScriptStep>>,
    current: Option<VecDeque<ScriptStep>>,
    log: SessionLog,
    closed: bool,
}

#[async_trait]
impl AgentSession for ScriptedSession {
    async fn query(&mut self, prompt: &str) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.log.push(SessionLogEntry::Query {
            prompt: prompt.to_string(),
        });
        self.current = Some(self.scripts.pop_front().unwrap_or_default());
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<RawEvent>, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let Some(step) = self.current.as_mut().and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        match step {
            ScriptStep::Event(raw) => {
                self.log.push(SessionLogEntry::Pulled {
                    frame_type: raw.frame_type().map(str::to_string),
                });
                Ok(Some(raw))
            }
            ScriptStep::Hang => std::future::pending().await,
            ScriptStep::Error(message) => Err(SessionError::Runtime(message)),
        }
    }

    async fn respond(&mut self, response: &ToolResponse) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.log.push(SessionLogEntry::Responded {
            request_id: response.request_id.clone(),
            decision: response.decision,
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if !self.closed {
            self.closed = true;
            self.log.push(SessionLogEntry::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::frames;

    #[tokio::test]
    async fn test_replays_one_script_per_query() {
        let factory = ScriptedSessionFactory::new(vec![
            vec![frames::text("first").into(), frames::result(0.01, true).into()],
            vec![frames::result(0.02, true).into()],
        ]);
        let mut session = factory.open(&SessionOptions::default()).await.unwrap();

        session.query("one").await.unwrap();
        assert!(session.next_event().await.unwrap().is_some());
        assert!(session.next_event().await.unwrap().is_some());
        assert!(session.next_event().await.unwrap().is_none());

        session.query("two").await.unwrap();
        assert_eq!(
            session.next_event().await.unwrap().unwrap().frame_type(),
            Some("result")
        );
        session.close().await.unwrap();
        session.close().await.unwrap();

        let log = factory.log();
        assert_eq!(log.prompts(), vec!["one", "two"]);
        assert_eq!(log.opened(), 1);
        assert_eq!(log.closed(), 1);
    }

    #[tokio::test]
    async fn test_error_step_and_closed_session() {
        let factory = ScriptedSessionFactory::new(vec![vec![ScriptStep::Error("boom".into())]]);
        let mut session = factory.open(&SessionOptions::default()).await.unwrap();
        session.query("p").await.unwrap();
        assert!(matches!(
            session.next_event().await,
            Err(SessionError::Runtime(m)) if m == "boom"
        ));
        session.close().await.unwrap();
        assert!(matches!(session.query("again").await, Err(SessionError::Closed)));
    }

    #[tokio::test]
    async fn test_failing_factory() {
        assert!(
            ScriptedSessionFactory::failing()
                .open(&SessionOptions::default())
                .await
                .is_err()
        );
    }
}
