use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use crate::media::PlaybackSource;

pub const URL_PLACEHOLDER: &str = "%URL%";

pub struct LaunchOptions<'a> {
    // `%URL%` is replaced with the playback URL, or the URL is appended.
    pub command: &'a [String],
    pub source: &'a PlaybackSource,
    pub detach: bool,
}

pub fn build_command(command: &[String], source: &PlaybackSource) -> Result<(String, Vec<String>)> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| anyhow!("player command is empty"))?;
    if program.trim().is_empty() {
        bail!("player command is empty");
    }
    if source.playback_url.trim().is_empty() {
        bail!("video URL missing");
    }

    let mut args: Vec<String> = Vec::with_capacity(rest.len() + 2);
    let mut substituted = false;
    for arg in rest {
        if arg.contains(URL_PLACEHOLDER) {
            substituted = true;
            args.push(arg.replace(URL_PLACEHOLDER, &source.playback_url));
        } else {
            args.push(arg.clone());
        }
    }
    if !substituted {
        args.push(source.playback_url.clone());
    }

    if is_mpv(program) && !source.label.is_empty() {
        args.push(format!("--force-media-title={}", source.label));
    }

    Ok((program.clone(), args))
}

fn is_mpv(program: &str) -> bool {
    Path::new(program)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.eq_ignore_ascii_case("mpv"))
}

pub fn launch(opts: LaunchOptions<'_>) -> Result<()> {
    let (program, args) = build_command(opts.command, opts.source)?;
    debug!(program = %program, ?args, "launching player");

    let mut command = Command::new(&program);
    command.args(&args);
    command.stdin(Stdio::null());
    if opts.detach {
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        command
            .spawn()
            .with_context(|| format!("launch {program} for {}", opts.source.playback_url))?;
        return Ok(());
    }

    let status = command
        .status()
        .with_context(|| format!("launch {program} for {}", opts.source.playback_url))?;
    if !status.success() {
        bail!("{program} exited with status {:?}", status.code());
    }
    Ok(())
}
