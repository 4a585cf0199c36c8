use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

/// Write a synthetic measurements CSV for trying out the dashboard.
#[derive(Debug, Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Output path.
    #[arg(long, default_value = "sample_measurements.csv")]
    output: PathBuf,

    /// PRNG seed; the same seed always produces the same file.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// First year of data.
    #[arg(long, default_value_t = 2019)]
    first_year: i32,

    /// Number of years of monthly data.
    #[arg(long, default_value_t = 4)]
    years: i32,
}

/// One CSV row, with the dashboard's expected headers.
#[derive(Debug, Serialize)]
struct Row<'a> {
    #[serde(rename = "State")]
    state: &'a str,
    #[serde(rename = "County")]
    county: &'a str,
    #[serde(rename = "Material")]
    material: &'a str,
    #[serde(rename = "Month/Year")]
    period: String,
    #[serde(rename = "Monthly Measurements")]
    value: f64,
    #[serde(rename = "Yearly Measurement Average")]
    yearly_average: f64,
}

const COUNTIES: &[(&str, &[&str])] = &[
    ("ND", &["Cass", "Burleigh", "Grand Forks"]),
    ("MN", &["Clay", "Hennepin"]),
    ("CA", &["Kern", "Fresno", "Los Angeles"]),
];

/// (material, typical level, seasonal amplitude as a fraction of the level)
const MATERIALS: &[(&str, f64, f64)] = &[
    ("PM2.5", 8.0, 0.35),
    ("CO", 0.4, 0.30),
    ("Ozone", 0.035, 0.25),
    ("NO2", 12.0, 0.20),
    ("AQI", 40.0, 0.30),
];

/// Every n-th row gets a malformed period token.
const MALFORMED_EVERY: usize = 97;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Monthly values for one year: seasonal cycle plus noise, never negative.
fn year_of_values(rng: &mut SimpleRng, level: f64, amplitude: f64) -> Vec<f64> {
    (1..=12)
        .map(|month| {
            let phase = (month as f64 - 1.0) / 12.0 * 2.0 * std::f64::consts::PI;
            let seasonal = level * (1.0 + amplitude * phase.cos());
            rng.gauss(seasonal, level * 0.1).max(0.0)
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let mut rows = 0usize;
    let mut malformed = 0usize;
    for &(state, counties) in COUNTIES {
        for &county in counties {
            // County-level offset so lines are distinguishable.
            let county_scale = 0.8 + rng.next_f64() * 0.4;
            for &(material, level, amplitude) in MATERIALS {
                for year in args.first_year..args.first_year + args.years {
                    let values = year_of_values(&mut rng, level * county_scale, amplitude);
                    let yearly_average = values.iter().sum::<f64>() / values.len() as f64;
                    for (i, value) in values.into_iter().enumerate() {
                        rows += 1;
                        let period = if rows % MALFORMED_EVERY == 0 {
                            malformed += 1;
                            "N/A".to_string()
                        } else {
                            format!("{:02}/{year}", i + 1)
                        };
                        writer
                            .serialize(Row {
                                state,
                                county,
                                material,
                                period,
                                value,
                                yearly_average,
                            })
                            .context("writing row")?;
                    }
                }
            }
        }
    }
    writer.flush().context("flushing output")?;

    println!(
        "Wrote {rows} measurements ({malformed} with malformed periods) to {}",
        args.output.display()
    );
    Ok(())
}
