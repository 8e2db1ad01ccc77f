use std::collections::BTreeSet;
use std::process::{Command, Stdio};

/// One container/codec combination the recorder may produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerChoice {
    /// MIME type advertised for the artifact.
    pub mime_type: &'static str,
    /// ffmpeg muxer name (`-f`).
    pub format: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
    /// ffmpeg video encoder; `None` uses the muxer default.
    pub video_codec: Option<&'static str>,
    /// ffmpeg audio encoder; `None` uses the muxer default.
    pub audio_codec: Option<&'static str>,
}

impl ContainerChoice {
    /// Whether the video encoder belongs to the libvpx family.
    pub fn is_vpx(&self) -> bool {
        matches!(self.video_codec, Some("libvpx" | "libvpx-vp9"))
    }
}

/// Containers in order of preference.
pub const PREFERRED_CONTAINERS: [ContainerChoice; 3] = [
    ContainerChoice {
        mime_type: "video/webm;codecs=vp9,opus",
        format: "webm",
        extension: "webm",
        video_codec: Some("libvpx-vp9"),
        audio_codec: Some("libopus"),
    },
    ContainerChoice {
        mime_type: "video/webm;codecs=vp8,opus",
        format: "webm",
        extension: "webm",
        video_codec: Some("libvpx"),
        audio_codec: Some("libopus"),
    },
    ContainerChoice {
        mime_type: "video/webm",
        format: "webm",
        extension: "webm",
        video_codec: None,
        audio_codec: None,
    },
];

/// Used when no preferred container is available.
pub const FALLBACK_CONTAINER: ContainerChoice = ContainerChoice {
    mime_type: "video/x-matroska",
    format: "matroska",
    extension: "mkv",
    video_codec: None,
    audio_codec: None,
};

/// Answers which encoders and muxers the encoding backend provides.
pub trait CodecProbe {
    /// Whether the named encoder exists.
    fn supports_encoder(&self, name: &str) -> bool;
    /// Whether the named muxer exists.
    fn supports_format(&self, name: &str) -> bool;

    /// Whether every part of `choice` is available.
    fn supports(&self, choice: &ContainerChoice) -> bool {
        self.supports_format(choice.format)
            && choice.video_codec.is_none_or(|c| self.supports_encoder(c))
            && choice.audio_codec.is_none_or(|c| self.supports_encoder(c))
    }
}

/// Probe backed by the system `ffmpeg` listings, queried once.
#[derive(Clone, Debug, Default)]
pub struct FfmpegProbe {
    encoders: BTreeSet<String>,
    formats: BTreeSet<String>,
}

impl FfmpegProbe {
    /// Run `ffmpeg -encoders` and `ffmpeg -muxers`; missing ffmpeg yields an empty probe.
    pub fn detect() -> Self {
        let encoders = ffmpeg_listing("-encoders")
            .map(|out| parse_listing(&out))
            .unwrap_or_default();
        let formats = ffmpeg_listing("-muxers")
            .map(|out| parse_listing(&out))
            .unwrap_or_default();
        tracing::debug!(
            encoders = encoders.len(),
            formats = formats.len(),
            "probed ffmpeg capabilities"
        );
        Self { encoders, formats }
    }
}

impl CodecProbe for FfmpegProbe {
    fn supports_encoder(&self, name: &str) -> bool {
        self.encoders.contains(name)
    }

    fn supports_format(&self, name: &str) -> bool {
        self.formats.contains(name)
    }
}

/// Fixed capability set.
#[derive(Clone, Debug, Default)]
pub struct StaticProbe {
    /// Encoder names.
    pub encoders: Vec<&'static str>,
    /// Muxer names.
    pub formats: Vec<&'static str>,
}

impl CodecProbe for StaticProbe {
    fn supports_encoder(&self, name: &str) -> bool {
        self.encoders.contains(&name)
    }

    fn supports_format(&self, name: &str) -> bool {
        self.formats.contains(&name)
    }
}

/// First supported entry of [`PREFERRED_CONTAINERS`], else [`FALLBACK_CONTAINER`].
pub fn select_container(probe: &dyn CodecProbe) -> ContainerChoice {
    match PREFERRED_CONTAINERS.iter().find(|c| probe.supports(c)) {
        Some(choice) => {
            tracing::info!(mime = choice.mime_type, "selected capture container");
            *choice
        }
        None => {
            tracing::warn!(
                mime = FALLBACK_CONTAINER.mime_type,
                "no preferred container supported; using fallback"
            );
            FALLBACK_CONTAINER
        }
    }
}

fn ffmpeg_listing(flag: &str) -> Option<String> {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", flag])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Names from an ffmpeg listing (`-encoders`, `-muxers`).
///
/// Rows look like ` V....D libvpx-vp9   libvpx VP9`; everything up to the ` --` separator is
/// a legend. Muxer rows may list several comma-separated names.
pub(crate) fn parse_listing(out: &str) -> BTreeSet<String> {
    let body = match out.find(" --") {
        Some(pos) => &out[pos..],
        None => out,
    };
    body.lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .flat_map(|names| names.split(','))
        .filter(|name| !name.is_empty() && *name != "=")
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/encode/container.rs"]
mod tests;
