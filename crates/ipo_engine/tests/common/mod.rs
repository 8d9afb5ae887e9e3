#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ipo_core::EmailMessage;
use ipo_engine::{MailError, MailTransport, Notifier, NotifierSettings};

#[derive(Default)]
struct Script {
    replies: HashMap<String, VecDeque<Result<(), MailError>>>,
    sent: Vec<(String, String)>,
    attempts: usize,
}

/// In-memory transport that replays scripted replies per recipient and
/// accepts everything else.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, recipient: &str, reply: Result<(), MailError>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .replies
            .entry(recipient.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Accepted messages as (recipient, subject).
    pub fn sent(&self) -> Vec<(String, String)> {
        self.script.lock().unwrap().sent.clone()
    }

    pub fn attempts(&self) -> usize {
        self.script.lock().unwrap().attempts
    }
}

#[async_trait::async_trait]
impl MailTransport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn verify(&self) -> Result<(), MailError> {
        Ok(())
    }

    async fn send(&self, recipient: &str, message: &EmailMessage) -> Result<(), MailError> {
        let mut script = self.script.lock().unwrap();
        script.attempts += 1;
        let reply = script
            .replies
            .get_mut(recipient)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()));
        if reply.is_ok() {
            script
                .sent
                .push((recipient.to_string(), message.subject.clone()));
        }
        reply
    }
}

pub fn notifier(transport: &ScriptedTransport, recipients: &[&str]) -> Notifier {
    let mut settings =
        NotifierSettings::new(recipients.iter().map(|r| r.to_string()).collect());
    settings.initial_backoff = Duration::from_millis(1);
    Notifier::new(Box::new(transport.clone()), settings)
}
