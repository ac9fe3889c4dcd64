use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use androidsink::config::{SinkConfig, ToneConfig};
use androidsink::framework::{self, LogNotifier};
use androidsink::pipeline::{LevelReport, ToneSource, Waveform};
use androidsink::plugins;
use androidsink::session::Session;
use androidsink::{init_logging, SinkHolder};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::TryRecvError;

#[derive(Parser, Debug)]
#[command(
    name = "sink_cli",
    about = "Desktop harness for the androidsink bootstrap and session"
)]
struct Cli {
    /// JSON configuration file (defaults to assets/sink_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Obtain the sink, start a session and print one level report per buffer
    Run(RunArgs),
    /// Write the configured test tone to a WAV file
    Record {
        #[command(flatten)]
        tone: ToneArgs,
        #[arg(long)]
        output: PathBuf,
    },
    /// List plugin libraries and register symbols for the configured plugins
    Plugins,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    tone: ToneArgs,
    /// Value for GST_DEBUG, applied before framework init
    #[arg(long)]
    gst_debug: Option<String>,
    /// Emit reports as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct ToneArgs {
    #[arg(long)]
    wave: Option<Waveform>,
    #[arg(long)]
    freq: Option<f64>,
    #[arg(long)]
    volume: Option<f64>,
    #[arg(long)]
    rate: Option<u32>,
    #[arg(long)]
    samples_per_buffer: Option<usize>,
    /// Stop after this many buffers (default: from config, 100 if unbounded)
    #[arg(long)]
    buffers: Option<u64>,
    /// Do not pace the sink against the clock
    #[arg(long)]
    no_sync: bool,
}

impl ToneArgs {
    fn apply(&self, mut tone: ToneConfig) -> ToneConfig {
        if let Some(wave) = self.wave {
            tone.wave = wave;
        }
        if let Some(freq) = self.freq {
            tone.freq = freq;
        }
        if let Some(volume) = self.volume {
            tone.volume = volume;
        }
        if let Some(rate) = self.rate {
            tone.sample_rate = rate;
        }
        if let Some(samples) = self.samples_per_buffer {
            tone.samples_per_buffer = samples;
        }
        tone.num_buffers = self.buffers.or(tone.num_buffers).or(Some(100));
        if self.no_sync {
            tone.sync = false;
        }
        tone
    }
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SinkConfig::load_from_file(path),
        None => SinkConfig::load(),
    };

    match cli.command {
        Commands::Run(args) => run_session(config, args),
        Commands::Record { tone, output } => run_record(config, tone, output),
        Commands::Plugins => run_plugins(&config),
    }
}

fn run_session(mut config: SinkConfig, args: RunArgs) -> Result<ExitCode> {
    if args.gst_debug.is_some() {
        config.debug.gst_debug = args.gst_debug.clone();
    }
    let tone = args.tone.apply(config.tone.clone());
    let session = Arc::new(Session::new(tone.clone()));

    let holder = SinkHolder::new(
        framework::default_framework(config.debug.default_threshold),
        Box::new(LogNotifier),
        session.clone(),
    )
    .with_debug_env(config.debug_env());

    let Some(sink) = holder.get_instance(&(), tone.sample_rate as i32, tone.samples_per_buffer as i32)
    else {
        bail!("framework initialization failed");
    };

    let mut reports = session.subscribe();
    sink.start();

    loop {
        match reports.try_recv() {
            Ok(report) => emit(&report, args.json)?,
            Err(TryRecvError::Empty) => {
                if !session.is_running() {
                    break;
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(TryRecvError::Lagged(skipped)) => eprintln!("skipped {skipped} reports"),
            Err(TryRecvError::Closed) => break,
        }
    }
    // Reports sent just before the session flagged itself stopped
    while let Ok(report) = reports.try_recv() {
        emit(&report, args.json)?;
    }
    session.wait();

    Ok(ExitCode::SUCCESS)
}

fn emit(report: &LevelReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!("buffer {:>6}  rms: {:.6}", report.buffer_index, report.rms);
    }
    Ok(())
}

fn run_record(config: SinkConfig, args: ToneArgs, output: PathBuf) -> Result<ExitCode> {
    let tone = args.apply(config.tone);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: tone.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let source = ToneSource::new(tone).context("invalid tone configuration")?;
    let mut writer = hound::WavWriter::create(&output, spec)
        .with_context(|| format!("creating {}", output.display()))?;

    let mut buffers = 0u64;
    for buffer in source {
        for sample in buffer {
            writer.write_sample(sample)?;
        }
        buffers += 1;
    }
    writer.finalize()?;

    println!("wrote {} buffers to {}", buffers, output.display());
    Ok(ExitCode::SUCCESS)
}

fn run_plugins(config: &SinkConfig) -> Result<ExitCode> {
    for name in &config.plugins.names {
        println!(
            "{:<20} {:<28} {}",
            name,
            plugins::library_name(name),
            plugins::register_symbol(name)
        );
    }
    Ok(ExitCode::SUCCESS)
}
