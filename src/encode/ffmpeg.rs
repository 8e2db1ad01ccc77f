use crate::audio::stream::F32leSpool;
use crate::encode::container::ContainerChoice;
use crate::encode::sink::{AudioTrackInfo, CaptureArtifact, MediaSink, SinkConfig, VideoTrackInfo};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SaxcatError, SaxcatResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

const STDOUT_CHUNK_BYTES: usize = 64 * 1024;

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Container and codecs to produce.
    pub container: ContainerChoice,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
    /// Directory for the audio spool and the intermediate video file.
    pub scratch_dir: PathBuf,
}

impl FfmpegSinkOpts {
    /// Options for `container`, spooling into the system temp directory.
    pub fn new(container: ContainerChoice) -> Self {
        Self {
            container,
            bg_rgba: [0, 0, 0, 255],
            scratch_dir: std::env::temp_dir(),
        }
    }
}

type Drain<T> = JoinHandle<std::io::Result<T>>;

/// Sink that spawns the system `ffmpeg`, streams raw frames to stdin and collects the encoded
/// container from stdout as segments.
///
/// Audio is spooled to disk while recording and muxed into the video on `finish`.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_rx: Option<mpsc::Receiver<Vec<u8>>>,
    stdout_drain: Option<Drain<()>>,
    stderr_drain: Option<Drain<Vec<u8>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames: u64,
    audio: Option<F32leSpool>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stdout_rx: None,
            stdout_drain: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            frames: 0,
            audio: None,
        }
    }

    fn video_command(&self, cfg: &SinkConfig) -> Command {
        let container = &self.opts.container;
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Input: raw RGBA8 frames, flattened to opaque in push_frame.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an"]);

        if let Some(codec) = container.video_codec {
            cmd.args(["-c:v", codec]);
        }
        if container.is_vpx() {
            cmd.args(["-deadline", "realtime", "-cpu-used", "8", "-b:v", "2M"]);
        }
        cmd.args(["-pix_fmt", "yuv420p", "-f", container.format, "pipe:1"]);
        cmd
    }

    fn shutdown_encoder(&mut self) -> SaxcatResult<Vec<Vec<u8>>> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| SaxcatError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            SaxcatError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        if let Some(handle) = self.stdout_drain.take() {
            handle
                .join()
                .map_err(|_| SaxcatError::encode("ffmpeg stdout drain thread panicked"))?
                .map_err(|e| SaxcatError::encode(format!("ffmpeg stdout read failed: {e}")))?;
        }
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SaxcatError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| SaxcatError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(SaxcatError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(self
            .stdout_rx
            .take()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default())
    }

    fn mux_audio(
        &self,
        video: &[u8],
        spool: &F32leSpool,
        cfg: &SinkConfig,
    ) -> SaxcatResult<Vec<u8>> {
        let audio = cfg
            .audio
            .ok_or_else(|| SaxcatError::encode("mux requested without an audio track"))?;
        let container = &self.opts.container;
        let video_file = TempFile::create(
            &self.opts.scratch_dir,
            &format!("video.{}", container.extension),
            video,
        )?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .args(["-loglevel", "error", "-i"])
            .arg(video_file.path())
            .args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(spool.path())
            .args(["-map", "0:v", "-map", "1:a", "-c:v", "copy"]);
        if let Some(codec) = container.audio_codec {
            cmd.args(["-c:a", codec]);
        }
        cmd.args(["-f", container.format, "pipe:1"]);

        let out = cmd.output().map_err(|e| {
            SaxcatError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        if !out.status.success() {
            return Err(SaxcatError::encode(format!(
                "ffmpeg mux exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(out.stdout)
    }
}

impl MediaSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> SaxcatResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(SaxcatError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SaxcatError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(SaxcatError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 {
                return Err(SaxcatError::validation(
                    "audio sample_rate must be non-zero when audio is enabled",
                ));
            }
            if audio.channels == 0 {
                return Err(SaxcatError::validation(
                    "audio channels must be non-zero when audio is enabled",
                ));
            }
        }

        if !is_ffmpeg_on_path() {
            return Err(SaxcatError::encode(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        std::fs::create_dir_all(&self.opts.scratch_dir).map_err(|e| {
            SaxcatError::encode(format!(
                "failed to create scratch directory '{}': {e}",
                self.opts.scratch_dir.display()
            ))
        })?;
        self.audio = match cfg.audio.as_ref() {
            Some(audio) => Some(F32leSpool::create(
                scratch_path(&self.opts.scratch_dir, "audio.f32le"),
                audio.channels,
            )?),
            None => None,
        };

        let mut child = self.video_command(&cfg).spawn().map_err(|e| {
            SaxcatError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SaxcatError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| SaxcatError::encode("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SaxcatError::encode("failed to open ffmpeg stderr (unexpected)"))?;

        let (tx, rx) = mpsc::channel();
        let stdout_drain = std::thread::spawn(move || {
            let mut buf = vec![0u8; STDOUT_CHUNK_BYTES];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    return Ok(());
                }
                if tx.send(buf[..n].to_vec()).is_err() {
                    // Receiver gone (aborted); keep draining so ffmpeg can exit.
                    std::io::copy(&mut stdout, &mut std::io::sink())?;
                    return Ok(());
                }
            }
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            mime = self.opts.container.mime_type,
            width = cfg.width,
            height = cfg.height,
            audio = cfg.audio.is_some(),
            "ffmpeg encoder started"
        );

        self.scratch = vec![0u8; (cfg.width * cfg.height * 4) as usize];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout_rx = Some(rx);
        self.stdout_drain = Some(stdout_drain);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SaxcatResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SaxcatError::capture("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(SaxcatError::capture(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(SaxcatError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(SaxcatError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SaxcatError::capture("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            SaxcatError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames += 1;
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> SaxcatResult<()> {
        let spool = self
            .audio
            .as_mut()
            .ok_or_else(|| SaxcatError::capture("ffmpeg sink was started without audio"))?;
        spool.append(samples)
    }

    fn take_segments(&mut self) -> Vec<Vec<u8>> {
        self.stdout_rx
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }

    fn finish(mut self: Box<Self>, mut segments: Vec<Vec<u8>>) -> SaxcatResult<CaptureArtifact> {
        let cfg = self
            .cfg
            .clone()
            .ok_or_else(|| SaxcatError::capture("ffmpeg sink not started"))?;
        segments.extend(self.shutdown_encoder()?);
        let video_bytes = segments.concat();
        if video_bytes.is_empty() {
            return Err(SaxcatError::encode("ffmpeg produced no output"));
        }

        let video = VideoTrackInfo {
            width: cfg.width,
            height: cfg.height,
            fps: cfg.fps,
            frames: self.frames,
        };

        let spool = self.audio.take();
        let (bytes, audio) = match (spool, cfg.audio) {
            (Some(mut spool), Some(track)) if spool.frames() > 0 => {
                spool.finish()?;
                let muxed = self.mux_audio(&video_bytes, &spool, &cfg)?;
                let info = AudioTrackInfo {
                    sample_rate: track.sample_rate,
                    channels: track.channels,
                    frames: spool.frames(),
                };
                (muxed, Some(info))
            }
            _ => (video_bytes, None),
        };

        let container = self.opts.container;
        tracing::info!(
            mime = container.mime_type,
            frames = video.frames,
            audio = audio.is_some(),
            bytes = bytes.len(),
            "ffmpeg capture finalized"
        );
        Ok(CaptureArtifact::new(
            container.mime_type,
            container.extension,
            bytes,
            video,
            audio,
        ))
    }

    fn abort(mut self: Box<Self>) {
        self.kill();
        tracing::debug!(frames = self.frames, "ffmpeg sink aborted");
    }
}

impl FfmpegSink {
    fn kill(&mut self) {
        drop(self.stdin.take());
        drop(self.stdout_rx.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stdout_drain.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        self.audio = None;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.kill();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` goes before `-i`; rational FPS as `num/den`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> SaxcatResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(SaxcatError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (s[0] as u16 + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (s[1] as u16 + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (s[2] as u16 + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

fn scratch_path(dir: &Path, suffix: &str) -> PathBuf {
    let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("saxcat-{}-{n}-{suffix}", std::process::id()))
}

/// Scratch file removed on drop.
struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn create(dir: &Path, suffix: &str, bytes: &[u8]) -> SaxcatResult<Self> {
        let path = scratch_path(dir, suffix);
        std::fs::write(&path, bytes).map_err(|e| {
            SaxcatError::encode(format!("failed to write '{}': {e}", path.display()))
        })?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> SaxcatResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
