//! Line-oriented tuning loop
//!
//! Every parameter change re-runs the pipeline. A failed configure is reported and
//! the settings stay as they were. A failed resize keeps the previous output image;
//! a failed run at the current size may leave it partially written until the next
//! successful command.

use crate::save_output;
use fsr_wgpu::presets::PipelineMode;
use fsr_wgpu::{Extent, FsrUpscaler, WgpuBackend};
use std::io::{BufRead, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Sharpness range exposed to the user
const SHARPNESS_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

const HELP: &str = "\
commands:
  sharpness <0.0-2.0>   set sharpness in stops
  mode <fsr|bilinear>   select the pipeline mode
  toggle                switch between fsr and bilinear
  scale <factor>        set output extent to input * factor
  size <width> <height> set output extent
  run                   re-run the pipeline
  save [path]           write the current output
  status                print the current settings
  quit                  exit";

#[derive(Debug, PartialEq)]
enum Command {
    Sharpness(f32),
    Mode(PipelineMode),
    Toggle,
    Scale(f64),
    Size(Extent),
    Run,
    Save(Option<PathBuf>),
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        fn number<T: FromStr>(arg: Option<&&str>, what: &str) -> Result<T, String> {
            arg.ok_or_else(|| format!("missing {what}"))?.parse().map_err(|_| format!("invalid {what}"))
        }

        let command = match name {
            "sharpness" => {
                let sharpness: f32 = number(args.first(), "sharpness")?;
                if !SHARPNESS_RANGE.contains(&sharpness) {
                    return Err(format!("sharpness must be within {SHARPNESS_RANGE:?}"));
                }
                Command::Sharpness(sharpness)
            }
            "mode" => Command::Mode(args.first().ok_or("missing mode")?.parse().map_err(|e| format!("{e}"))?),
            "toggle" => Command::Toggle,
            "scale" => Command::Scale(number(args.first(), "scale factor")?),
            "size" => Command::Size(Extent::new(number(args.first(), "width")?, number(args.get(1), "height")?)),
            "run" => Command::Run,
            "save" => Command::Save(args.first().map(PathBuf::from)),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(format!("unknown command '{name}', type 'help'")),
        };
        Ok(command)
    }
}

/// Reads commands from stdin until `quit` or end of input
pub fn run(upscaler: &mut FsrUpscaler<'_, WgpuBackend>, default_output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{HELP}");
    print_status(upscaler);

    let stdin = std::io::stdin();
    prompt()?;
    for line in stdin.lock().lines() {
        let line = line?;
        if !line.trim().is_empty() {
            match line.parse::<Command>() {
                Ok(command) => match execute(upscaler, command, default_output) {
                    Ok(ControlFlow::Break(())) => break,
                    Ok(ControlFlow::Continue(())) => {}
                    Err(e) => tracing::error!("{e}"),
                },
                Err(e) => eprintln!("{e}"),
            }
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

fn execute(upscaler: &mut FsrUpscaler<'_, WgpuBackend>, command: Command, default_output: &Path) -> Result<ControlFlow<()>, Box<dyn std::error::Error>> {
    let settings = upscaler.settings();
    match command {
        Command::Sharpness(sharpness) => {
            upscaler.configure(settings.output_extent, sharpness, settings.mode)?;
        }
        Command::Mode(mode) => {
            upscaler.configure(settings.output_extent, settings.sharpness, mode)?;
        }
        Command::Toggle => {
            upscaler.configure(settings.output_extent, settings.sharpness, settings.mode.toggled())?;
            println!("mode: {}", upscaler.settings().mode);
        }
        Command::Scale(factor) => {
            upscaler.configure_scale(factor, settings.sharpness, settings.mode)?;
            println!("output: {}", upscaler.settings().output_extent);
        }
        Command::Size(extent) => {
            upscaler.on_resize(extent)?;
        }
        Command::Run => {
            upscaler.run()?;
        }
        Command::Save(path) => save_output(upscaler, path.as_deref().unwrap_or(default_output))?,
        Command::Status => print_status(upscaler),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(ControlFlow::Break(())),
    }
    Ok(ControlFlow::Continue(()))
}

fn print_status(upscaler: &FsrUpscaler<'_, WgpuBackend>) {
    let settings = upscaler.settings();
    println!(
        "input {} -> output {} | mode {} | sharpness {:.2} | {:?}",
        upscaler.input_extent(),
        settings.output_extent,
        settings.mode,
        settings.sharpness,
        upscaler.state()
    );
}
