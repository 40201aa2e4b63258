use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    rc::Rc,
    thread,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use icicles_core::{
    colors, Animation, AppConfig, Clock, CodecKind, Color, FileAnimation, FileFrame, FrameListener, Header,
    Icicles, IciclesError, MusicAnimation, PacingMode, PcmSignal, Player, SharedClock, SystemClock,
    WriterTransport,
};
use tracing_subscriber::EnvFilter;

fn main() -> icicles_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => run_play(args),
        Commands::Inspect { file } => run_inspect(&file),
        Commands::Demo {
            output,
            frames,
            frame_ms,
        } => run_demo(&output, frames, frame_ms),
    }
}

fn run_play(args: PlayArgs) -> icicles_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };
    if args.compensate {
        config.player.pacing = PacingMode::Compensated;
    }
    tracing::info!(files = args.files.len(), codec = %args.codec, pacing = ?config.player.pacing, "starting playback");

    let clock: SharedClock = Rc::new(SystemClock::start());
    let animations = args
        .files
        .iter()
        .map(|path| load_animation(path, &config, args.codec, &clock))
        .collect::<icicles_core::Result<Vec<_>>>()?;

    let sink: Box<dyn Write> = match args.output.as_deref() {
        None => Box::new(io::sink()),
        Some(path) if path == Path::new("-") => Box::new(io::stdout().lock()),
        Some(path) => Box::new(io::BufWriter::new(fs::File::create(path)?)),
    };

    let mut player = Player::new(WriterTransport::new(sink), clock.clone(), config.player.clone());
    let milestones: Rc<dyn FrameListener> = Rc::new(|frame: u64| {
        if frame > 0 && frame % 500 == 0 {
            tracing::debug!(frame, "frame milestone");
        }
    });
    player.add_listener(milestones)?;
    player.play(Some(animations))?;

    let limit = args.seconds.map(Duration::from_secs_f64);
    while player.is_playing() {
        let now = clock.now();
        if limit.is_some_and(|limit| now >= limit) {
            break;
        }
        match player.next_deadline() {
            Some(deadline) if deadline > now => {
                let mut wait = deadline - now;
                if let Some(limit) = limit {
                    wait = wait.min(limit.saturating_sub(now));
                }
                thread::sleep(wait);
            }
            Some(_) => {
                player.poll();
            }
            None => break,
        }
    }
    player.stop();

    let stats = player.stats();
    tracing::info!(
        pulls = stats.pulls,
        frames = stats.frames_submitted,
        wraps = stats.wraps,
        failures = player.transport().failures(),
        max_pull = ?stats.max_pull_time,
        "playback finished"
    );
    Ok(())
}

fn load_animation(
    path: &Path,
    config: &AppConfig,
    codec: CodecKind,
    clock: &SharedClock,
) -> icicles_core::Result<Animation> {
    if is_wav(path) {
        let (samples, sample_rate) = read_wav(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(?path, sample_rate, samples = samples.len(), "decoded audio");
        let signal = PcmSignal::new(name, samples, sample_rate, clock.clone());
        Ok(MusicAnimation::new(Box::new(signal), config.clone())
            .with_codec(codec)
            .into())
    } else {
        let animation = FileAnimation::decode(&fs::read(path)?)?;
        tracing::info!(?path, frames = animation.animation_frames_count(), "decoded animation");
        Ok(animation.into())
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("wav"))
}

/// Decodes a WAV file and downmixes it to mono samples in `[-1, 1]`.
fn read_wav(path: &Path) -> icicles_core::Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|err| IciclesError::decode(format!("{}: {err}", path.display())))?;
    let spec = reader.spec();

    let interleaved: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let scale = (1_i64 << spec.bits_per_sample.saturating_sub(1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect()
        }
    };
    let interleaved = interleaved.map_err(|err| IciclesError::decode(format!("{}: {err}", path.display())))?;

    let channels = usize::from(spec.channels.max(1));
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

fn run_inspect(file: &Path) -> icicles_core::Result<()> {
    if is_wav(file) {
        let (samples, sample_rate) = read_wav(file)?;
        let header = AppConfig::default().music.header(file.display().to_string());
        println!("audio: {}", header.name);
        println!("  grid: {}x{}, radio panels: {}", header.x_count, header.y_count, header.radio_panels_count);
        println!("  sample rate: {sample_rate} Hz");
        println!("  duration: {:.2}s", samples.len() as f64 / f64::from(sample_rate.max(1)));
        return Ok(());
    }

    let animation = FileAnimation::decode(&fs::read(file)?)?;
    let header = animation.header();
    println!("animation: {}", header.name);
    println!("  grid: {}x{}, radio panels: {}", header.x_count, header.y_count, header.radio_panels_count);
    println!("  loops: {}, version: {}", header.loops_count, header.version_number);
    println!("  frames: {}", animation.animation_frames_count());
    Ok(())
}

/// Writes a column chase animation, handy for checking wiring.
fn run_demo(output: &Path, frames: usize, frame_ms: u64) -> icicles_core::Result<()> {
    let music = AppConfig::default().music;
    let header = Header::new("demo", music.x_count, music.y_count, music.radio_panels_count);
    let mut icicles = Icicles::new(&header);

    let mut entries = vec![FileFrame::RadioColor {
        panel: 0,
        color: colors::ORANGE,
    }];
    for step in 0..frames {
        icicles.set_all_pixels_color(colors::BLACK);
        let x = step % icicles.x_count();
        let y_count = icicles.y_count();
        for y in 0..y_count {
            let color = Color::linear_blend(colors::RED, colors::BLUE, y as f32 / y_count as f32);
            icicles.set_pixel_color(x, y, color);
        }
        entries.push(FileFrame::Visual {
            duration_ms: frame_ms,
            pixels: icicles.pixels().to_vec(),
        });
    }

    let animation = FileAnimation::new(header, entries)?;
    fs::write(output, animation.encode()?)?;
    tracing::info!(?output, frames, "demo animation written");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Streams animations and music to the Icicles installation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a looping playlist of animation files and WAV tracks.
    Play(PlayArgs),
    /// Print the header of an animation file or WAV track.
    Inspect {
        file: PathBuf,
    },
    /// Write a generated animation file.
    Demo {
        output: PathBuf,
        #[arg(long, default_value_t = 60)]
        frames: usize,
        #[arg(long, default_value_t = 40)]
        frame_ms: u64,
    },
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Animation files (JSON) or `.wav` tracks, played in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Codec used to render WAV tracks.
    #[arg(long, default_value_t = CodecKind::Classic)]
    codec: CodecKind,
    /// Optional JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Where encoded frames go; `-` for stdout. Frames are discarded when
    /// omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Stop after this many seconds instead of looping forever.
    #[arg(long)]
    seconds: Option<f64>,
    /// Chain frame deadlines instead of rescheduling from the fire time.
    #[arg(long)]
    compensate: bool,
}
