mod config;

use config::Config;
use pf1_formula::{
    dice_roll::FormulaRoll, limits::FormulaLimits, parse, preprocess::prepare, simplify,
    size_reach, size_roll, Size, Stature,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::{path::PathBuf, time::Instant};

const USAGE: &str = "usage: pf1-roll [--config FILE] [--data JSON] [--lenient] COMMAND
commands:
    simplify FORMULA
    size COUNT SIDES TARGET [INITIAL]
    reach [SIZE] [REACH] [tall|long]
    limits FORMULA
    roll FORMULA [TIMES]";

fn main() {
    pretty_env_logger::init();
    log::info!("logger created");
    if let Err(e) = run(std::env::args().skip(1).collect()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let mut config_path: Option<PathBuf> = std::env::var_os("PF1_CONFIG").map(PathBuf::from);
    let mut data: Option<String> = None;
    let mut lenient = false;
    let mut rest: Vec<String> = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(args.next().ok_or(USAGE)?)),
            "--data" => data = Some(args.next().ok_or(USAGE)?),
            "--lenient" => lenient = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ => rest.push(arg),
        }
    }

    let mut config = match config_path {
        Some(path) => Config::load(&path),
        None => Config::default(),
    };
    if let Some(data) = data {
        config.data = serde_json::from_str(&data).map_err(|e| format!("invalid roll data: {}", e))?;
    }
    if lenient {
        config.strict = false;
    }

    let mut rest = rest.into_iter();
    let command = rest.next().ok_or(USAGE)?;
    let rest: Vec<String> = rest.collect();
    match command.as_str() {
        "simplify" => {
            let formula = rest.join(" ");
            let simplified = simplify(&config.rules, &formula, &config.data, config.options())
                .map_err(|e| e.to_string())?;
            println!("{}", simplified);
        }
        "size" => {
            let number = |i: usize| -> Result<f64, String> {
                rest.get(i)
                    .ok_or_else(|| USAGE.to_string())?
                    .parse()
                    .map_err(|e| format!("{}: {}", rest[i], e))
            };
            let size = |i: usize| -> Result<Size, String> {
                match rest.get(i) {
                    Some(text) => text.parse().map_err(|e| format!("{}", e)),
                    None => Ok(Size::Medium),
                }
            };
            let term = size_roll(&config.rules, number(0)?, number(1)?, size(2)?, size(3)?);
            println!("{}", term);
        }
        "reach" => {
            let size: Size = match rest.get(0) {
                Some(text) => text.parse().map_err(|e| format!("{}", e))?,
                None => Size::Medium,
            };
            let reach = rest
                .get(1)
                .map_or(false, |r| r == "1" || r.eq_ignore_ascii_case("true"));
            let stature: Stature = match rest.get(2) {
                Some(text) => text.parse().map_err(|e| format!("{}", e))?,
                None => Stature::Tall,
            };
            println!("{}", size_reach(&config.rules, size, reach, stature));
        }
        "limits" => {
            let formula = parse(&prepare(&rest.join(" "), &config.data)).map_err(|e| e.to_string())?;
            let min = formula.min(&config.rules).map_err(|e| e.to_string())?;
            let max = formula.max(&config.rules).map_err(|e| e.to_string())?;
            println!("{} {}", min, max);
        }
        "roll" => {
            let (text, times) = match rest.split_last() {
                Some((last, init)) if !init.is_empty() && last.parse::<u32>().is_ok() => {
                    (init.join(" "), last.parse::<u32>().unwrap_or(1))
                }
                _ => (rest.join(" "), 1),
            };
            let formula = parse(&prepare(&text, &config.data)).map_err(|e| e.to_string())?;
            let mut master_rng = ChaCha20Rng::from_entropy();
            for _ in 0..times {
                let mut seed: <Xoshiro256PlusPlus as SeedableRng>::Seed = Default::default();
                master_rng.fill(&mut seed);
                let mut rng = Xoshiro256PlusPlus::from_seed(seed);
                let deadline = Instant::now() + config.roll_timeout();
                let (total, throws) = formula
                    .roll(&config.rules, &mut || Instant::now() > deadline, &mut rng)
                    .map_err(|e| e.to_string())?;
                println!("{} {:?}", pf1_formula::formula_types::format_number(total), throws);
            }
        }
        other => return Err(format!("unknown command {}\n{}", other, USAGE)),
    }
    Ok(())
}
