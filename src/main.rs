//! wiresynth CLI: check, inspect and render patch files.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wiresynth::config::Config;
use wiresynth::dsl::{CompileOutput, Compiler};
use wiresynth::engine::Engine;
use wiresynth::unit::UnitRegistry;

#[derive(Parser)]
#[command(name = "wiresynth")]
#[command(about = "Compile and render synthesizer patches", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.wiresynth/config.yaml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a patch and report diagnostics
    Check {
        file: PathBuf,
    },

    /// Compile a patch and print its structure as JSON
    Ir {
        file: PathBuf,
    },

    /// Play one note through a patch and write a WAV file
    Render {
        file: PathBuf,

        /// Output WAV file path
        #[arg(short, long)]
        out: PathBuf,

        /// MIDI note number
        #[arg(short, long, default_value = "60")]
        note: u8,

        /// Note velocity 0.0-1.0
        #[arg(long, default_value = "1.0")]
        velocity: f64,

        /// Total length in seconds
        #[arg(short, long, default_value = "2.0")]
        seconds: f64,

        /// How long the note is held, in seconds
        #[arg(long, default_value = "1.0")]
        hold: f64,

        /// Set a knob before rendering, as name=value
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, f64)>,
    },
}

fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for {name}: {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn Error>> {
    match path {
        Some(path) => Ok(Config::load_from(path)?),
        None => Ok(Config::load().unwrap_or_default()),
    }
}

/// Compile `file`, printing every diagnostic to stderr.
fn compile(file: &Path, registry: &UnitRegistry, config: &Config) -> Result<CompileOutput, Box<dyn Error>> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let output = Compiler::compile(&source, registry.catalog(), &config.compile);
    for diagnostic in output.diagnostics() {
        eprintln!("{}: {}", file.display(), diagnostic.render(&source));
    }
    Ok(output)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let registry = UnitRegistry::with_defaults();

    match cli.command {
        Commands::Check { file } => {
            let output = compile(&file, &registry, &config)?;
            if output.structure.is_none() {
                std::process::exit(1);
            }
            println!("{}: ok", file.display());
        }
        Commands::Ir { file } => {
            let output = compile(&file, &registry, &config)?;
            let Some(structure) = output.structure else {
                std::process::exit(1);
            };
            println!("{}", structure.to_json()?);
        }
        Commands::Render {
            file,
            out,
            note,
            velocity,
            seconds,
            hold,
            set,
        } => {
            let output = compile(&file, &registry, &config)?;
            let Some(structure) = output.structure else {
                std::process::exit(1);
            };
            let mut engine = Engine::new(&structure, &registry, &config.engine)?;
            for (name, value) in &set {
                if !engine.set_parameter(name, *value) {
                    return Err(format!("unknown parameter: {name}").into());
                }
            }
            render(&mut engine, &config, &out, note, velocity, seconds, hold)?;
        }
    }

    Ok(())
}

fn render(
    engine: &mut Engine,
    config: &Config,
    out: &Path,
    note: u8,
    velocity: f64,
    seconds: f64,
    hold: f64,
) -> Result<(), Box<dyn Error>> {
    let sample_rate = config.engine.sample_rate;
    let total = (seconds.max(0.0) * f64::from(sample_rate)) as usize;
    let release_at = ((hold.max(0.0) * f64::from(sample_rate)) as usize).min(total);
    let block_size = config.engine.block_size.max(1);

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(out, spec)
        .map_err(|e| format!("failed to create {}: {e}", out.display()))?;

    let mut buffer = vec![0.0f32; block_size * 2];
    let mut rendered = 0;
    engine.note_on(note, velocity);
    if release_at == 0 {
        engine.note_off(note, 0.0);
    }
    while rendered < total {
        let mut end = (rendered + block_size).min(total);
        if rendered < release_at && end > release_at {
            end = release_at;
        }
        let frames = &mut buffer[..(end - rendered) * 2];
        engine.generate_into(frames);
        for &sample in frames.iter() {
            writer.write_sample(sample)?;
        }
        rendered = end;
        if rendered == release_at {
            engine.note_off(note, 0.0);
        }
    }
    writer.finalize()?;

    info!(frames = total, path = %out.display(), "rendered");
    println!("wrote {} ({seconds:.2}s, {sample_rate} Hz)", out.display());
    Ok(())
}
