//! Page context: one task per page that owns the page, saves progress on a
//! timer or on request, and drives the resume coordinator.

use std::future::pending;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use conwatch_core::config::AppConfig;
use conwatch_core::orchestrator::{
    check_policy, now_millis, select_video, video_draft, SaveOutcome, Trigger,
    NOTICE_NO_VIDEO, NOTICE_SAVED,
};
use conwatch_core::resume::{ResumeCoordinator, ResumeState};
use conwatch_detect::{PageControl, PageObserver};

use crate::message::{Message, Response};
use crate::schedule::{PollSchedule, PollTick};
use crate::transport::{self, Channel, Envelope, TransportError};

/// Input to a page context.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// The locator may have changed without a reload.
    Navigated,
    Message(Message),
    /// Run a save evaluation and report the outcome.
    Save(Trigger),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageReply {
    Message(Response),
    Saved(SaveOutcome),
}

pub type PageInbox = mpsc::UnboundedReceiver<Envelope<PageEvent, PageReply>>;

/// Address of a running page context.
#[derive(Clone)]
pub struct PageHandle {
    channel: Channel<PageEvent, PageReply>,
}

impl PageHandle {
    pub async fn request(&self, message: Message) -> Result<Response, TransportError> {
        match self.channel.request(PageEvent::Message(message)).await? {
            PageReply::Message(response) => Ok(response),
            PageReply::Saved(_) => Ok(Response::failed()),
        }
    }

    pub async fn save(&self, trigger: Trigger) -> Result<SaveOutcome, TransportError> {
        match self.channel.request(PageEvent::Save(trigger)).await? {
            PageReply::Saved(outcome) => Ok(outcome),
            PageReply::Message(_) => Ok(SaveOutcome::Failed("unexpected reply".into())),
        }
    }

    pub fn navigated(&self) -> Result<(), TransportError> {
        self.channel.notify(PageEvent::Navigated)
    }
}

pub struct PageContext<P> {
    page: P,
    background: Channel<Message, Response>,
    config: AppConfig,
    resume: ResumeCoordinator,
    last_url: Url,
}

impl<P> PageContext<P>
where
    P: PageObserver + PageControl + Send + 'static,
{
    pub fn new(page: P, background: Channel<Message, Response>, config: AppConfig) -> Self {
        let last_url = page.location();
        Self {
            page,
            background,
            config,
            resume: ResumeCoordinator::new(),
            last_url,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn resume_state(&self) -> &ResumeState {
        self.resume.state()
    }

    /// Start the context on the current runtime.
    ///
    /// The task ends when every [`PageHandle`] is dropped and hands the
    /// context back.
    pub fn spawn(self) -> (PageHandle, JoinHandle<Self>) {
        // A manual save waits on the background in turn.
        let timeout = self.config.messaging.request_timeout() * 2;
        let (channel, inbox) = transport::channel(timeout);
        let task = tokio::spawn(self.run(inbox));
        (PageHandle { channel }, task)
    }

    pub async fn run(mut self, mut inbox: PageInbox) -> Self {
        let every = self.config.autosave.interval();
        let mut autosave = time::interval_at(Instant::now() + every, every);
        autosave.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut poll = self.check_resume();
        let mut settle: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = autosave.tick() => {
                    let outcome = self.trigger(Trigger::Periodic).await;
                    debug!(?outcome, "Periodic save evaluated");
                }
                env = inbox.recv() => {
                    let Some(env) = env else { break };
                    match env.message.clone() {
                        PageEvent::Navigated => {
                            let location = self.page.location();
                            if location != self.last_url {
                                debug!(url = %location, "Locator changed");
                                self.last_url = location;
                                poll = None;
                                self.resume.reset();
                                settle = Some(Instant::now() + self.config.resume.navigation_settle());
                            }
                            env.respond(PageReply::Message(Response::ok()));
                        }
                        PageEvent::Message(message) => {
                            let response = self.handle_message(&message);
                            env.respond(PageReply::Message(response));
                        }
                        PageEvent::Save(trigger) => {
                            let outcome = self.trigger(trigger).await;
                            env.respond(PageReply::Saved(outcome));
                        }
                    }
                }
                tick = next_poll(&mut poll) => match tick {
                    PollTick::Tick => {
                        self.resume.poll(&mut self.page);
                        if !self.resume.is_scanning() {
                            // Our own marker strip is not a navigation.
                            self.last_url = self.page.location();
                            poll = None;
                        }
                    }
                    PollTick::Expired => {
                        self.resume.expire();
                        poll = None;
                    }
                },
                _ = sleep_until(settle) => {
                    settle = None;
                    poll = self.check_resume();
                }
            }
        }

        debug!(url = %self.last_url, "Page context closed");
        self
    }

    /// Evaluate one save. Never fails; every stop reason is an outcome.
    pub async fn trigger(&mut self, trigger: Trigger) -> SaveOutcome {
        let video = match select_video(&self.page, trigger) {
            Ok(video) => video,
            Err(outcome) => {
                if trigger.is_manual() && outcome == SaveOutcome::NoVideoFound {
                    self.notice(NOTICE_NO_VIDEO);
                }
                return outcome;
            }
        };

        if !trigger.is_manual() {
            let settings = match self.background.request(Message::GetSettings).await {
                Ok(Response::Settings { settings }) => settings,
                Ok(other) => {
                    warn!(?other, "Unexpected settings reply");
                    return SaveOutcome::Failed("unexpected settings reply".into());
                }
                Err(e) => {
                    debug!(error = %e, "Settings unavailable, skipping periodic save");
                    return SaveOutcome::Failed(e.to_string());
                }
            };
            if let Err(outcome) = check_policy(&self.page.location(), trigger, &settings) {
                return outcome;
            }
        }

        let draft = video_draft(&self.page, &video, now_millis());
        let id = draft.id.clone();
        let timestamp = draft.timestamp;

        match self.background.request(Message::SaveVideo { data: draft }).await {
            Ok(response) if response.is_success() => {
                info!(%id, timestamp, ?trigger, "Progress saved");
                if trigger.is_manual() {
                    self.notice(NOTICE_SAVED);
                }
                SaveOutcome::Saved { id, timestamp }
            }
            Ok(_) => {
                warn!(%id, "Background rejected save");
                SaveOutcome::Failed("save rejected".into())
            }
            Err(e) => {
                warn!(%id, error = %e, "Could not reach background");
                SaveOutcome::Failed(e.to_string())
            }
        }
    }

    fn handle_message(&mut self, message: &Message) -> Response {
        match message {
            Message::GetVideoDetails => {
                let data = conwatch_detect::main_video(&self.page)
                    .map(|video| video_draft(&self.page, &video, now_millis()));
                Response::Details { data }
            }
            other => {
                debug!(?other, "Message not handled by page context");
                Response::failed()
            }
        }
    }

    fn check_resume(&mut self) -> Option<PollSchedule> {
        let location = self.page.location();
        self.last_url = location.clone();
        self.resume.on_navigation(&location);
        self.resume.is_scanning().then(|| {
            PollSchedule::new(
                self.config.resume.poll_interval(),
                self.config.resume.timeout(),
            )
        })
    }

    fn notice(&mut self, text: &str) {
        let ttl = self.config.notice.dismiss();
        self.page.show_notice(text, ttl);
    }
}

async fn next_poll(poll: &mut Option<PollSchedule>) -> PollTick {
    match poll {
        Some(schedule) => schedule.tick().await,
        None => pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => pending().await,
    }
}
