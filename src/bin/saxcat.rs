use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use saxcat::audio::monitor::WavMonitor;
use saxcat::render::surface::write_png;

#[derive(Parser, Debug)]
#[command(name = "saxcat", version, about = "A saxophone-playing cat, rendered and recorded")]
struct Cli {
    /// Studio config JSON (missing fields keep their defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run without audio (visual-only sessions).
    #[arg(long, global = true)]
    no_audio: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render consecutive frames in parallel and print their digests.
    Frames(FramesArgs),
    /// Print the melody schedule.
    Events(EventsArgs),
    /// Run the live preview for a while.
    Preview(PreviewArgs),
    /// Record one clip (requires `ffmpeg` on PATH unless `--digest`).
    Record(RecordArgs),
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Session time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct FramesArgs {
    /// First frame index.
    #[arg(long, default_value_t = 0)]
    from: u64,

    /// Number of frames.
    #[arg(long)]
    count: u64,

    /// Write each frame as `frame_NNNNN.png` into this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Worker threads (defaults to rayon's choice).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct EventsArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Seconds to preview before stopping.
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,

    /// Also write the monitored audio to this WAV file.
    #[arg(long)]
    monitor_wav: Option<PathBuf>,

    /// Save the last previewed frame as a PNG.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// Directory receiving the timestamped artifact.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Keep capturing until the final note has decayed.
    #[arg(long)]
    include_tail: bool,

    /// Run on a virtual clock (as fast as rendering allows).
    #[arg(long)]
    virtual_clock: bool,

    /// Produce a frame-digest artifact instead of a video (no ffmpeg needed).
    #[arg(long)]
    digest: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.as_deref())?;
    if cli.no_audio {
        cfg.audio_enabled = false;
    }

    match cli.cmd {
        Command::Frame(args) => cmd_frame(&cfg, args),
        Command::Frames(args) => cmd_frames(&cfg, args),
        Command::Events(args) => cmd_events(&cfg, args),
        Command::Preview(args) => cmd_preview(cfg, args),
        Command::Record(args) => cmd_record(cfg, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<saxcat::StudioConfig> {
    match path {
        Some(path) => Ok(saxcat::StudioConfig::from_path(path)?),
        None => Ok(saxcat::StudioConfig::default()),
    }
}

fn cmd_frame(cfg: &saxcat::StudioConfig, args: FrameArgs) -> anyhow::Result<()> {
    let frame = saxcat::render_frame(args.time, cfg.canvas()?)?;
    write_png(&frame, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_frames(cfg: &saxcat::StudioConfig, args: FramesArgs) -> anyhow::Result<()> {
    let fps = cfg.frame_rate()?;
    let times: Vec<f64> = (args.from..args.from + args.count)
        .map(|i| fps.frame_time_secs(saxcat::FrameIndex(i)))
        .collect();
    let frames =
        saxcat::FrameRenderer::new().render_range(&times, cfg.canvas()?, args.threads)?;

    for (offset, frame) in frames.iter().enumerate() {
        let idx = args.from + offset as u64;
        println!("{idx:>6} {:>10.4} {:016x}", times[offset], frame.digest());
        if let Some(dir) = args.out_dir.as_ref() {
            write_png(frame, &dir.join(format!("frame_{idx:05}.png")))?;
        }
    }
    Ok(())
}

fn cmd_events(cfg: &saxcat::StudioConfig, args: EventsArgs) -> anyhow::Result<()> {
    let events = saxcat::build_event_sequence(cfg.duration_secs, cfg.bpm)?;
    if args.json {
        let json = serde_json::to_string_pretty(&events).context("serialize events")?;
        println!("{json}");
        return Ok(());
    }
    println!("{:>4} {:>8} {:>5} {:>8} {:>9}", "#", "onset", "step", "length", "freq");
    for (i, ev) in events.iter().enumerate() {
        println!(
            "{i:>4} {:>8.3} {:>5} {:>8.3} {:>9.2}",
            ev.onset_secs,
            ev.scale_step,
            ev.length_secs,
            ev.frequency_hz()
        );
    }
    Ok(())
}

fn cmd_preview(cfg: saxcat::StudioConfig, args: PreviewArgs) -> anyhow::Result<()> {
    let mut studio = saxcat::Studio::with_system_clock(cfg)?;
    if let Some(path) = args.monitor_wav.as_ref() {
        if studio.engine().is_available() {
            let sr = studio.engine().sample_rate();
            let monitor = WavMonitor::create(path, sr, saxcat::audio::engine::MIX_CHANNELS)?;
            studio.engine_mut().set_monitor(Some(Box::new(monitor)));
        } else {
            eprintln!("audio unavailable; not writing {}", path.display());
        }
    }

    let result = studio.run_preview_for(args.seconds);
    if let Some(monitor) = studio.engine_mut().set_monitor(None) {
        monitor.finish()?;
    }
    result?;

    eprintln!(
        "previewed {} frames",
        studio.surface().frames_presented()
    );
    if let Some(path) = args.snapshot.as_ref() {
        studio.surface().save_png(path)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_record(mut cfg: saxcat::StudioConfig, args: RecordArgs) -> anyhow::Result<()> {
    if args.include_tail {
        cfg.capture_tail = saxcat::CaptureTail::IncludeRelease;
    }
    let clock: Arc<dyn saxcat::Clock> = if args.virtual_clock {
        Arc::new(saxcat::ManualClock::new())
    } else {
        Arc::new(saxcat::SystemClock::new())
    };
    let mut studio = saxcat::Studio::new(cfg, clock)?;

    let sink: Box<dyn saxcat::MediaSink> = if args.digest {
        Box::new(saxcat::DigestSink::new())
    } else {
        let container = saxcat::select_container(&saxcat::FfmpegProbe::detect());
        Box::new(saxcat::FfmpegSink::new(saxcat::FfmpegSinkOpts::new(container)))
    };

    match studio.record(sink)? {
        Some(artifact) => {
            let path = artifact.write_into(&args.out_dir)?;
            eprintln!(
                "wrote {} ({}, {} bytes, {:.3}s, {} track(s))",
                path.display(),
                artifact.mime_type,
                artifact.bytes.len(),
                artifact.duration_secs,
                artifact.track_count()
            );
        }
        None => eprintln!("recording not completed"),
    }
    Ok(())
}
