use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{info, warn};
use ptttl::parser::{decompress_if_gzip, FileSource, InputSource, MemorySource};
use ptttl::wav::{self, WavWriter};
use ptttl::{GeneratorConfig, SampleGenerator, Waveform};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ptttl")]
#[command(version = "0.1.0")]
#[command(about = "PTTTL/RTTTL to WAV converter", long_about = None)]
struct Args {
    /// Input PTTTL/RTTTL file, optionally gzipped (reads from stdin if not specified)
    input: Option<PathBuf>,

    /// Output WAV file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Waveform used for every channel
    #[arg(short, long, value_enum, default_value_t = WaveformArg::Sine)]
    waveform: WaveformArg,

    /// JSON file with generator settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Attack length in samples
    #[arg(long)]
    attack: Option<u32>,

    /// Decay length in samples
    #[arg(long)]
    decay: Option<u32>,

    /// Output amplitude, 0.0 - 1.0
    #[arg(long)]
    amplitude: Option<f32>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WaveformArg {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl From<WaveformArg> for Waveform {
    fn from(arg: WaveformArg) -> Self {
        match arg {
            WaveformArg::Sine => Waveform::Sine,
            WaveformArg::Triangle => Waveform::Triangle,
            WaveformArg::Square => Waveform::Square,
            WaveformArg::Sawtooth => Waveform::Sawtooth,
        }
    }
}

fn main() -> Result<(), ptttl::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    match &args.input {
        Some(path) => convert(FileSource::open(path)?, &args, config),
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            convert(MemorySource::new(decompress_if_gzip(data)?), &args, config)
        }
    }
}

/// Generator settings from `--config`, overridden by individual flags
fn load_config(args: &Args) -> Result<GeneratorConfig, ptttl::Error> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => GeneratorConfig::default(),
    };

    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(attack) = args.attack {
        config.attack_samples = attack;
    }
    if let Some(decay) = args.decay {
        config.decay_samples = decay;
    }
    if let Some(amplitude) = args.amplitude {
        config.amplitude = amplitude;
    }

    config.validate()?;
    Ok(config)
}

fn convert<S: InputSource>(
    source: S,
    args: &Args,
    config: GeneratorConfig,
) -> Result<(), ptttl::Error> {
    let parser = ptttl::Parser::new(source)?;
    info!(
        "'{}': {} channel(s) at {} bpm",
        parser.name(),
        parser.channel_count(),
        parser.settings().bpm
    );
    if parser.settings().bpm == 0 {
        warn!("no BPM setting found; the first note will fail to parse");
    }

    let mut generator = SampleGenerator::new(parser, config)?;
    for channel in 0..generator.channel_count() {
        generator.set_waveform(channel, args.waveform.into())?;
    }

    match &args.output {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            write_wav(&mut generator, file, config.sample_rate)?;
        }
        None => {
            // stdout cannot seek, so the WAV is assembled in memory first
            let bytes = write_wav(&mut generator, Cursor::new(Vec::new()), config.sample_rate)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes.into_inner())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn write_wav<S: InputSource, W: Write + Seek>(
    generator: &mut SampleGenerator<S>,
    out: W,
    sample_rate: u32,
) -> Result<W, ptttl::Error> {
    let mut writer = WavWriter::new(out, sample_rate)?;
    let samples = wav::render(generator, &mut writer)?;
    info!("wrote {} samples", samples);
    writer.finalize()
}
