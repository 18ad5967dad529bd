//! A small demo: augmentation parameters for a stream of image batches,
//! drawn from a composed sampler and summarized per column.

use indicatif::{ProgressBar, ProgressStyle};
use mini_sampler::{Params, Sampler, TruncateOptions};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use ndarray_stats::QuantileExt;
use std::error::Error;
use std::f64::consts::FRAC_PI_4;
use tracing_subscriber::EnvFilter;

/// Builds a sampler producing `(angle, scale, shift_x, shift_y)` rows.
fn augmentation_sampler() -> Result<Sampler, Box<dyn Error>> {
    let angle = Sampler::leaf(
        "u",
        Params::new().with("low", -FRAC_PI_4).with("high", FRAC_PI_4),
    )?;

    // Mostly mild zoom, sometimes a strong one.
    let mild = Sampler::leaf("n", Params::new().with("loc", 1.0).with("scale", 0.05))? & 4.0;
    let strong = Sampler::leaf("ln", Params::new().with("mean", 0.3).with("sigma", 0.2))?;
    let scale = (mild | strong).truncate(TruncateOptions::between(0.5, 2.0));

    let shift = Sampler::leaf("n", Params::new().with("scale", 8.0).with("dim", 2))?.floor_div(1.0);

    Ok(angle & scale & shift)
}

/// Main entry point: draws parameters for every batch of a dataset and
/// prints summary statistics.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    const N_ITEMS: usize = 100_000;
    const BATCH_SIZE: usize = 256;
    const SEED: u64 = 42;

    let mut sampler = augmentation_sampler()?.set_seed(SEED);
    log::info!("sampler tree: {sampler:?}");

    let n_batches = N_ITEMS.div_ceil(BATCH_SIZE);
    let pb = ProgressBar::new(n_batches as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let mut batches: Vec<Array2<f64>> = Vec::with_capacity(n_batches);
    for i in 0..n_batches {
        let size = BATCH_SIZE.min(N_ITEMS - i * BATCH_SIZE);
        batches.push(sampler.sample(size)?);
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    let views: Vec<ArrayView2<f64>> = batches.iter().map(|b| b.view()).collect();
    let params = concatenate(Axis(0), &views)?;
    println!("Generated {} parameter rows", params.nrows());

    for (name, column) in ["angle", "scale", "shift_x", "shift_y"]
        .iter()
        .zip(params.axis_iter(Axis(1)))
    {
        println!(
            "{name:>8}: mean {:>7.3}  min {:>7.3}  max {:>7.3}",
            column.mean().unwrap_or(f64::NAN),
            column.min_skipnan(),
            column.max_skipnan(),
        );
    }
    Ok(())
}

#[test]
fn test_main() {
    main().expect("Expected main to not return an error.");
}
