use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::download::Downloader;
use crate::filename;
use crate::media::PlaybackSource;
use crate::moderation::{self, Presentation};
use crate::reaction::Reaction;
use crate::retrieval::{LoadOutcome, LoadedReaction, Orchestrator, RetrievalError};

pub const REVIEW_SUBMITTED: &str = "Submitted for manual review";
pub const REVIEW_FAILED: &str = "Failed to submit review";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading,
    Ready(Box<LoadedReaction>),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("No reaction is loaded.")]
    NoReaction,
    #[error("Manual review cannot be requested for this reaction.")]
    ReviewUnavailable,
    #[error("A review request is already in progress.")]
    ReviewInFlight,
    #[error("Download URL is not available.")]
    DownloadUnavailable,
    #[error("Downloads are not configured.")]
    NoDownloader,
}

enum AsyncResponse {
    Load {
        generation: u64,
        result: Result<LoadOutcome, RetrievalError>,
    },
    Review {
        generation: u64,
        result: anyhow::Result<()>,
    },
    Download {
        path: Option<PathBuf>,
    },
}

pub struct ReactionView {
    orchestrator: Arc<Orchestrator>,
    downloader: Option<Arc<Downloader>>,
    start_offset_secs: f64,
    reaction_id: Option<String>,
    state: ViewState,
    generation: u64,
    load_pending: bool,
    review_in_flight: bool,
    downloads_in_flight: usize,
    notification: Option<Notification>,
    saved: Vec<PathBuf>,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl ReactionView {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        downloader: Option<Arc<Downloader>>,
        start_offset_secs: f64,
    ) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            orchestrator,
            downloader,
            start_offset_secs,
            reaction_id: None,
            state: ViewState::Idle,
            generation: 0,
            load_pending: false,
            review_in_flight: false,
            downloads_in_flight: 0,
            notification: None,
            saved: Vec::new(),
            response_tx,
            response_rx,
        }
    }

    pub fn open(&mut self, reaction_id: &str) {
        self.generation = self.generation.wrapping_add(1);
        self.reaction_id = Some(reaction_id.to_string());
        self.review_in_flight = false;
        self.notification = None;

        if reaction_id.trim().is_empty() {
            self.load_pending = false;
            self.state = ViewState::NotFound;
            return;
        }

        self.load_pending = true;
        self.state = ViewState::Loading;
        let generation = self.generation;
        let orchestrator = self.orchestrator.clone();
        let tx = self.response_tx.clone();
        let id = reaction_id.to_string();
        thread::spawn(move || {
            let result = orchestrator.load(&id);
            let _ = tx.send(AsyncResponse::Load { generation, result });
        });
    }

    pub fn reaction_id(&self) -> Option<&str> {
        self.reaction_id.as_deref()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn loaded(&self) -> Option<&LoadedReaction> {
        match &self.state {
            ViewState::Ready(loaded) => Some(loaded),
            _ => None,
        }
    }

    pub fn reaction(&self) -> Option<&Reaction> {
        self.loaded().map(|loaded| &loaded.reaction)
    }

    pub fn presentation(&self) -> Option<Presentation> {
        let reaction = self.reaction()?;
        let presentation = moderation::classify(
            reaction.moderation_status,
            reaction.moderation_details.as_deref(),
            reaction.has_media(),
        );
        Some(match presentation {
            Presentation::Notice { message, .. } => Presentation::Notice {
                message,
                review: moderation::review_action(
                    reaction.moderation_status,
                    self.review_in_flight,
                ),
            },
            other => other,
        })
    }

    pub fn playable(&self) -> Option<PlaybackSource> {
        match self.presentation()? {
            Presentation::Playable => self.playback_source(),
            _ => None,
        }
    }

    pub fn download_filename(&self) -> Option<String> {
        let loaded = self.loaded()?;
        let source = self.playable()?;
        let reaction = &loaded.reaction;
        Some(filename::synthesize(
            loaded
                .parent
                .as_ref()
                .and_then(|parent| parent.content.as_deref()),
            reaction.name.as_deref(),
            reaction.created_at.as_deref(),
            &source.playback_url,
        ))
    }

    fn playback_source(&self) -> Option<PlaybackSource> {
        PlaybackSource::from_reaction(self.reaction()?, self.start_offset_secs)
    }

    pub fn request_review(&mut self) -> Result<(), ActionError> {
        let Some(reaction) = self.reaction() else {
            return Err(ActionError::NoReaction);
        };
        if self.review_in_flight {
            return Err(ActionError::ReviewInFlight);
        }
        if !moderation::review_action(reaction.moderation_status, false).enabled {
            return Err(ActionError::ReviewUnavailable);
        }
        let Some(id) = reaction.id.clone().or_else(|| self.reaction_id.clone()) else {
            return Err(ActionError::NoReaction);
        };

        self.review_in_flight = true;
        self.notification = None;
        let generation = self.generation;
        let orchestrator = self.orchestrator.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = orchestrator.submit_for_manual_review(&id);
            let _ = tx.send(AsyncResponse::Review { generation, result });
        });
        Ok(())
    }

    pub fn download(&mut self) -> Result<String, ActionError> {
        let Some(downloader) = self.downloader.clone() else {
            return Err(ActionError::NoDownloader);
        };
        let (Some(source), Some(name)) = (self.playable(), self.download_filename()) else {
            return Err(ActionError::DownloadUnavailable);
        };

        self.downloads_in_flight += 1;
        let tx = self.response_tx.clone();
        let filename = name.clone();
        thread::spawn(move || {
            let path = downloader.download_best_effort(&source.playback_url, &filename);
            let _ = tx.send(AsyncResponse::Download { path });
        });
        Ok(name)
    }

    pub fn is_busy(&self) -> bool {
        self.load_pending || self.review_in_flight || self.downloads_in_flight > 0
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    pub fn saved_downloads(&self) -> &[PathBuf] {
        &self.saved
    }

    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.response_rx.recv_timeout(timeout) {
            Ok(message) => {
                self.handle_async_response(message);
                self.poll();
                true
            }
            Err(_) => false,
        }
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Load { generation, result } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "discarding stale load");
                    return;
                }
                self.load_pending = false;
                self.state = match result {
                    Ok(LoadOutcome::Found(loaded)) => ViewState::Ready(loaded),
                    Ok(LoadOutcome::NotFound) => ViewState::NotFound,
                    Err(err) => {
                        let RetrievalError::Failed(source) = &err;
                        let detail = format!("{source:#}");
                        warn!(error = %detail, "reaction load failed");
                        ViewState::Failed(err.to_string())
                    }
                };
            }
            AsyncResponse::Review { generation, result } => {
                if generation != self.generation {
                    return;
                }
                self.review_in_flight = false;
                match result {
                    Ok(()) => {
                        if let ViewState::Ready(loaded) = &mut self.state {
                            moderation::confirm_review(&mut loaded.reaction.moderation_status);
                        }
                        self.notification = Some(Notification {
                            kind: NotificationKind::Success,
                            message: REVIEW_SUBMITTED.to_string(),
                        });
                    }
                    Err(err) => {
                        let detail = format!("{err:#}");
                        warn!(error = %detail, "manual review request failed");
                        self.notification = Some(Notification {
                            kind: NotificationKind::Error,
                            message: REVIEW_FAILED.to_string(),
                        });
                    }
                }
            }
            AsyncResponse::Download { path } => {
                self.downloads_in_flight = self.downloads_in_flight.saturating_sub(1);
                if let Some(path) = path {
                    info!(path = %path.display(), "saved reaction media");
                    self.saved.push(path);
                }
            }
        }
    }
}
