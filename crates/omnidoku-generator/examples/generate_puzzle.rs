//! Generates a handful of puzzles and prints their output lines.
//!
//! ```console
//! $ cargo run --release -p omnidoku-generator --example generate_puzzle
//! ```

use omnidoku_generator::{GenerateRunConfig, runner};

fn main() {
    env_logger::init();

    let cfg = GenerateRunConfig {
        box_rows: 3,
        box_cols: 3,
        target_puzzles: 5,
        difficulty_level_required: 2,
        threads: 2,
        max_total_time_s: 30,
        output_folder: std::env::temp_dir()
            .join("omnidoku_example")
            .to_string_lossy()
            .into_owned(),
        ..GenerateRunConfig::default()
    };

    match runner::run(&cfg, runner::RunHooks::default()) {
        Ok(result) => {
            println!(
                "accepted {} puzzles in {:.2}s ({:.2}/s), attempts {}",
                result.accepted, result.elapsed_s, result.accepted_per_sec, result.attempts
            );
            let path = std::path::Path::new(&cfg.output_folder).join(&cfg.output_file);
            if let Ok(contents) = std::fs::read_to_string(path) {
                for line in contents.lines() {
                    println!("{line}");
                }
            }
        }
        Err(error) => eprintln!("generation failed: {error}"),
    }
}
