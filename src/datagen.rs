use anyhow::{Context, Result};
use rvtable::{generate_demo, DataMode, DemoOptions};
use std::env;
use std::path::PathBuf;

struct Config {
    options: DemoOptions,
    output_file: PathBuf,
    mode: DataMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            options: DemoOptions::default(),
            output_file: PathBuf::from("table.json"),
            mode: DataMode::Sync,
        }
    }
}

/// Takes the value following a flag.
fn value_of<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(value) => Ok(value),
        None => anyhow::bail!("{flag} requires an argument"),
    }
}

fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-roots" => config.options.roots = value_of(&args, &mut i, flag)?.parse()?,
            "-depth" => config.options.depth = value_of(&args, &mut i, flag)?.parse()?,
            "-children" => config.options.children = value_of(&args, &mut i, flag)?.parse()?,
            "-lazy_every" => config.options.lazy_every = value_of(&args, &mut i, flag)?.parse()?,
            "-seed" => config.options.seed = value_of(&args, &mut i, flag)?.parse()?,
            "-out" => config.output_file = PathBuf::from(value_of(&args, &mut i, flag)?),
            "-async" => config.mode = DataMode::Async,
            "-h" | "-help" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Warning: Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    Ok(config)
}

fn print_help() {
    println!("Table Dataset Generator");
    println!("Usage: vtable-datagen [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -roots <N>             Number of root rows (default: 1000)");
    println!("  -depth <N>             Inline child levels below each root (default: 1)");
    println!("  -children <N>          Inline children per level (default: 3)");
    println!("  -lazy_every <N>        Every N-th root loads children lazily, 0 disables (default: 10)");
    println!("  -seed <N>              Random seed (default: 42)");
    println!("  -async                 Mark the dataset for remote (provider) mode");
    println!("  -out <FILE>            Output file path (default: table.json)");
    println!("  -h, -help, --help      Show this help message");
}

fn main() -> Result<()> {
    let config = parse_args()?;

    let mut dataset = generate_demo(&config.options);
    if let Some(table_config) = dataset.config.as_mut() {
        table_config.mode = config.mode;
    }
    dataset
        .save(&config.output_file)
        .with_context(|| format!("writing {}", config.output_file.display()))?;

    println!(
        "Wrote {} rows ({} roots) to: {}",
        dataset.total_rows(),
        dataset.rows.len(),
        config.output_file.display()
    );
    Ok(())
}
