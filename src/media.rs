use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::reaction::Reaction;

static CLOUDINARY_UPLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://res\.cloudinary\.com/[^/?#]+/(?:video|image)/upload/)(?:so_[0-9]+(?:\.[0-9]+)?/)?(.*)$",
    )
    .expect("valid cloudinary pattern")
});

pub fn transform(raw_url: &str, start_offset_secs: f64) -> String {
    match CLOUDINARY_UPLOAD.captures(raw_url) {
        Some(caps) => format!(
            "{}so_{}/{}",
            &caps[1],
            format_offset(start_offset_secs),
            &caps[2]
        ),
        None => raw_url.to_string(),
    }
}

fn format_offset(secs: f64) -> String {
    let secs = if secs.is_finite() && secs > 0.0 { secs } else { 0.0 };
    let rounded = (secs * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as u64)
    } else {
        let text = format!("{rounded:.2}");
        text.trim_end_matches('0').to_string()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSource {
    pub playback_url: String,
    pub poster_url: Option<String>,
    pub duration: Option<f64>,
    pub label: String,
}

impl PlaybackSource {
    pub fn from_reaction(reaction: &Reaction, start_offset_secs: f64) -> Option<Self> {
        if !reaction.has_media() {
            return None;
        }
        let raw = reaction.video_url.as_deref()?.trim();
        let label = match reaction.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Cow::Owned(format!("Reaction from {name}")),
            _ => Cow::Borrowed("Reaction"),
        };
        Some(Self {
            playback_url: transform(raw, start_offset_secs),
            poster_url: reaction.thumbnail_url.clone(),
            duration: reaction.duration,
            label: label.into_owned(),
        })
    }
}
