use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::api;
use crate::config;
use crate::data::{ApiMessageService, ApiReactionService, MessageService, ReactionService};
use crate::download::Downloader;
use crate::player;
use crate::render;
use crate::retrieval::Orchestrator;
use crate::telemetry;
use crate::view::{ActionError, NotificationKind, ReactionView, ViewState};

const PAGE_WIDTH: usize = 80;
const WAIT_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub reaction_id: String,
    pub config_file: Option<PathBuf>,
    pub download: bool,
    pub output: Option<PathBuf>,
    pub request_review: bool,
    pub play: bool,
}

pub fn run(options: Options) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    telemetry::init(&cfg.log.filter)?;

    let client = api::Client::new(api::ClientConfig {
        base_url: Some(cfg.api.base_url.clone()),
        user_agent: cfg.api.user_agent.clone(),
        timeout: Some(cfg.api.timeout),
        http_client: None,
    })
    .context("create api client")?;
    let client = Arc::new(client);

    let reactions: Arc<dyn ReactionService> = Arc::new(ApiReactionService::new(client.clone()));
    let messages: Arc<dyn MessageService> = Arc::new(ApiMessageService::new(client));
    let orchestrator = Arc::new(Orchestrator::new(
        reactions,
        messages,
        cfg.retrieval.enrichment,
    ));

    let downloader = if options.download {
        let dir = options
            .output
            .clone()
            .or_else(|| cfg.media.download_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        Some(Arc::new(Downloader::new(dir, None).context("create downloader")?))
    } else {
        None
    };

    let mut view = ReactionView::new(orchestrator, downloader, cfg.media.start_offset_secs);
    view.open(&options.reaction_id);
    settle(&mut view);

    match view.state() {
        ViewState::NotFound => bail!(render::NOT_FOUND),
        ViewState::Failed(message) => bail!("{message}"),
        _ => {}
    }

    // Action errors leave the page intact and are reported after it.
    let mut skipped: Vec<ActionError> = Vec::new();
    if options.request_review {
        if let Err(err) = view.request_review() {
            skipped.push(err);
        }
    }
    let mut pending_download = None;
    if options.download {
        match view.download() {
            Ok(name) => pending_download = Some(name),
            Err(err) => skipped.push(err),
        }
    }
    settle(&mut view);

    print!("{}", render::render_view(&view, PAGE_WIDTH));

    for path in view.saved_downloads() {
        println!("Saved {}", path.display());
    }
    if let Some(name) = pending_download {
        if view.saved_downloads().is_empty() {
            eprintln!("Download of {name} failed");
        }
    }
    for err in &skipped {
        eprintln!("warning: {err}");
    }

    if options.play {
        match view.playable() {
            Some(source) => player::launch(player::LaunchOptions {
                command: &cfg.player.video_command,
                source: &source,
                detach: cfg.player.video_detach,
            })?,
            None => eprintln!("warning: reaction has no playable video"),
        }
    }

    if let Some(notification) = view
        .notification()
        .filter(|notification| notification.kind == NotificationKind::Error)
    {
        bail!("{}", notification.message);
    }
    Ok(())
}

fn settle(view: &mut ReactionView) {
    while view.is_busy() {
        if !view.wait(WAIT_SLICE) {
            debug!("waiting on reaction view");
        }
    }
}
