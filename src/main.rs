//! # charsheet CLI
//!
//! Usage:
//!   charsheet ysolde.json
//!   charsheet ysolde.json --template sheets/CharacterSheets.pdf -o out/ysolde.pdf
//!   charsheet --example > ysolde.json
//!   charsheet --dump-layout > layout.json

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use charsheet::{DrawPolicy, RenderOptions, SheetLayout, DEFAULT_TEMPLATE};

#[derive(Parser, Debug)]
#[command(name = "charsheet", version, about = "Fill a character sheet PDF from a JSON record")]
struct Cli {
    /// Character record (JSON)
    #[arg(required_unless_present_any = ["dump_layout", "example"])]
    input: Option<PathBuf>,

    /// Blank sheet to draw onto
    #[arg(long, env = "CHARSHEET_TEMPLATE", default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Output file [default: INPUT with a .pdf extension]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Slot table (JSON) to use instead of the built-in one
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Fail on text the sheet font cannot draw instead of substituting '?'
    #[arg(long)]
    strict: bool,

    /// Print the built-in slot table as JSON and exit
    #[arg(long)]
    dump_layout: bool,

    /// Print an example character record and exit
    #[arg(long)]
    example: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.example {
        print!("{}", example_record_json());
        return Ok(());
    }
    if cli.dump_layout {
        println!("{}", SheetLayout::standard().to_json_pretty());
        return Ok(());
    }

    let input = cli.input.context("no input file given")?;
    let options = RenderOptions {
        template: cli.template,
        output: cli.output,
        layout: cli.layout,
        policy: if cli.strict {
            DrawPolicy::Strict
        } else {
            DrawPolicy::Lenient
        },
    };

    let output = charsheet::render_file(&input, &options)
        .with_context(|| format!("could not fill sheet for {}", input.display()))?;
    println!("Complete, see output file: {}", output.display());
    Ok(())
}

fn example_record_json() -> &'static str {
    r##"{
  "name": "Ysolde Varga",
  "player": "Ann",
  "calling": "Duellist",
  "age": 31,
  "wealth_rating": 2,
  "vitality": 3,
  "coordination": 4,
  "wit": 3,
  "intellect": 2,
  "charm": 3,
  "will": 2,
  "prowess": 4,
  "actions": 2,
  "experience": 12,
  "corruption": {
    "physical": { "affliction": "Pale scar", "value": 1 },
    "desire": { "affliction": "", "value": 0 },
    "drive": { "affliction": "Vengeance", "value": 2 }
  },
  "skills": [
    { "name": "Swordplay", "rating": 4, "values": ["Parry", "Riposte"] },
    { "name": "Stealth", "rating": 2, "values": ["Shadows"] },
    { "name": "Etiquette", "rating": 3, "values": [] }
  ],
  "qualities": ["Brave", "Loyal", "Curious"],
  "impediments": ["Hot-headed"],
  "features": ["Left-handed"],
  "wounds": ["Broken rib"],
  "armour": ["Leather jerkin"],
  "weapons": [
    {
      "name": "Sabre",
      "rating": 3,
      "damage": 2,
      "range": 0,
      "ammo": 0,
      "cost": "20s",
      "ammo_cost": "",
      "features": "Parrying"
    },
    {
      "name": "Pistol",
      "rating": 2,
      "damage": 3,
      "range": 60,
      "ammo": 6,
      "cost": "45s",
      "ammo_cost": "1s",
      "features": "Loud"
    }
  ],
  "possessions": ["Rope", "Lantern", "Letter of marque"]
}
"##
}
