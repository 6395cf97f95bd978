use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use textwrap::Options as WrapOptions;

use crate::media::PlaybackSource;
use crate::moderation::Presentation;
use crate::reaction::{parse_timestamp, Reaction};
use crate::view::{Notification, NotificationKind, ReactionView, ViewState};

pub const NOT_FOUND: &str = "Reaction not found";
pub const NO_MEDIA: &str = "No video attached to this reaction.";
const DATE_UNAVAILABLE: &str = "Date not available";
const DISPLAY_FORMAT: &str = "%d %b %Y, %H:%M";

pub struct Page<'a> {
    pub reaction: &'a Reaction,
    pub presentation: &'a Presentation,
    pub playback: Option<&'a PlaybackSource>,
    pub download_name: Option<&'a str>,
    pub notification: Option<&'a Notification>,
}

pub fn render_view(view: &ReactionView, width: usize) -> String {
    match view.state() {
        ViewState::Idle => String::new(),
        ViewState::Loading => "Loading reaction...\n".to_string(),
        ViewState::NotFound => render_error(NOT_FOUND),
        ViewState::Failed(message) => render_error(message),
        ViewState::Ready(loaded) => {
            let Some(presentation) = view.presentation() else {
                return String::new();
            };
            let playback = view.playable();
            let download_name = view.download_filename();
            render_page(
                &Page {
                    reaction: &loaded.reaction,
                    presentation: &presentation,
                    playback: playback.as_ref(),
                    download_name: download_name.as_deref(),
                    notification: view.notification(),
                },
                width,
            )
        }
    }
}

pub fn render_error(message: &str) -> String {
    format!("Error\n{message}\n")
}

pub fn render_page(page: &Page<'_>, width: usize) -> String {
    let width = width.max(20);
    let reaction = page.reaction;
    let mut out = String::new();

    out.push_str("Reaction Details\n");
    let _ = writeln!(out, "{}", display_date(reaction.created_at_utc()));
    if let Some(name) = reaction.name.as_deref() {
        let _ = writeln!(out, "From: {name}");
    }

    match page.presentation {
        Presentation::Notice { message, review } => {
            out.push('\n');
            out.push_str(&textwrap::fill(message, width));
            out.push('\n');
            let state = if review.enabled { "" } else { " (disabled)" };
            let _ = writeln!(out, "[ {} ]{state}", review.label());
        }
        Presentation::Playable => {
            if let Some(playback) = page.playback {
                out.push('\n');
                let _ = writeln!(out, "Video: {}", playback.playback_url);
                if let Some(poster) = playback.poster_url.as_deref() {
                    let _ = writeln!(out, "Poster: {poster}");
                }
                if let Some(duration) = playback.duration {
                    let _ = writeln!(out, "Duration: {}", display_duration(duration));
                }
                if let Some(name) = page.download_name {
                    let _ = writeln!(out, "Download as: {name}");
                }
            }
        }
        Presentation::NoMedia => {
            out.push('\n');
            out.push_str(NO_MEDIA);
            out.push('\n');
        }
    }

    if let Some(replies) = reaction.replies.as_ref().filter(|replies| !replies.is_empty()) {
        out.push_str("\nReplies\n");
        let options = WrapOptions::new(width)
            .initial_indent("  ")
            .subsequent_indent("    ");
        for reply in replies {
            let when = reply
                .created_at
                .as_deref()
                .and_then(parse_timestamp)
                .map(|at| at.format(DISPLAY_FORMAT).to_string())
                .unwrap_or_else(|| DATE_UNAVAILABLE.to_string());
            let line = format!("\u{201c}{}\u{201d} ({when})", reply.text);
            out.push_str(&textwrap::fill(&line, &options));
            out.push('\n');
        }
    }

    if let Some(notification) = page.notification {
        let marker = match notification.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
        };
        let _ = writeln!(out, "\n[{marker}] {}", notification.message);
    }

    out
}

fn display_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| DATE_UNAVAILABLE.to_string())
}

fn display_duration(secs: f64) -> String {
    let total = secs.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::{self, ReviewAction};
    use crate::reaction::{ModerationStatus, Reply};

    fn reaction() -> Reaction {
        Reaction {
            id: Some("r1".into()),
            name: Some("Jane Doe".into()),
            video_url: Some("https://cdn.test/clip.mp4".into()),
            duration: Some(75.0),
            created_at: Some("2024-03-05T10:00:00Z".into()),
            ..Reaction::default()
        }
    }

    #[test]
    fn playable_page_lists_media_and_replies() {
        let mut reaction = reaction();
        reaction.replies = Some(vec![
            Reply {
                id: "a".into(),
                text: "hi".into(),
                created_at: Some("2024-03-06T09:30:00Z".into()),
                ..Reply::default()
            },
            Reply {
                id: "b".into(),
                text: "yo".into(),
                ..Reply::default()
            },
        ]);
        let playback = PlaybackSource::from_reaction(&reaction, 0.0).unwrap();
        let text = render_page(
            &Page {
                reaction: &reaction,
                presentation: &Presentation::Playable,
                playback: Some(&playback),
                download_name: Some("Reactlyve-video-Jane_Doe-05032024-1000.mp4"),
                notification: None,
            },
            80,
        );
        assert!(text.starts_with("Reaction Details\n05 Mar 2024, 10:00\nFrom: Jane Doe\n"));
        assert!(text.contains("Video: https://cdn.test/clip.mp4\n"));
        assert!(text.contains("Duration: 1:15\n"));
        assert!(text.contains("Download as: Reactlyve-video-Jane_Doe-05032024-1000.mp4\n"));
        let hi = text.find("\u{201c}hi\u{201d} (06 Mar 2024, 09:30)").unwrap();
        let yo = text.find("\u{201c}yo\u{201d} (Date not available)").unwrap();
        assert!(hi < yo);
    }

    #[test]
    fn notice_page_hides_media() {
        let mut reaction = reaction();
        reaction.moderation_status = ModerationStatus::ManualReview;
        reaction.created_at = None;
        let presentation = moderation::classify(reaction.moderation_status, None, true);
        let text = render_page(
            &Page {
                reaction: &reaction,
                presentation: &presentation,
                playback: None,
                download_name: None,
                notification: Some(&Notification {
                    kind: NotificationKind::Success,
                    message: "Submitted for manual review".into(),
                }),
            },
            80,
        );
        assert!(text.contains("Date not available"));
        assert!(text.contains("This video failed moderation.\n[ Manual Review Pending ] (disabled)\n"));
        assert!(!text.contains("Video:"));
        assert!(text.ends_with("[ok] Submitted for manual review\n"));
    }

    #[test]
    fn empty_page_says_no_media() {
        let mut reaction = reaction();
        reaction.video_url = None;
        let text = render_page(
            &Page {
                reaction: &reaction,
                presentation: &Presentation::NoMedia,
                playback: None,
                download_name: None,
                notification: None,
            },
            80,
        );
        assert!(text.contains(NO_MEDIA));
        assert!(!text.contains("Replies"));
    }

    #[test]
    fn rejected_notice_offers_review() {
        let reaction = reaction();
        let presentation = Presentation::Notice {
            message: moderation::notice_message(Some("spam")),
            review: ReviewAction {
                enabled: true,
                pending: false,
                submitting: false,
            },
        };
        let text = render_page(
            &Page {
                reaction: &reaction,
                presentation: &presentation,
                playback: None,
                download_name: None,
                notification: None,
            },
            80,
        );
        assert!(text.contains("This video was rejected: spam\n[ Request Review ]\n"));
        assert_eq!(render_error(NOT_FOUND), "Error\nReaction not found\n");
    }
}
