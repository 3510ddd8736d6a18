//! Renders a granular texture from a synthesized grain catalogue into a wav file.
//!
//! Usage:
//!   cargo run --release --example render-grains -- [OPTIONS]
//!
//! Options:
//!   -o, --output <PATH>      Target wav file (default: render-grains.wav)
//!   -l, --log-level <LEVEL>  Set logging level (debug, info, warn, error)
//!   --seed <N>               Random seed for deterministic renders (default: 0)
//!   --channels <N>           Output channel count (default: 2)
//!   --grains <N>             Unique grains per category (default: 12)
//!   --spacing <N>            Spacing between grains in frames (default: -2205)
//!   --bit-depth <16|24|32>   Wav sample format (default: 32)

use std::{f64::consts::PI, path::PathBuf, sync::Arc};

use arg::{parse_args, Args};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use grainweave::{
    assign_channels, crossfade_concat,
    effects::{
        AmplitudeModulationEffect, FilterEffect, GainEffect, IdentityEffect, ModulationPartial,
    },
    force_equal_energy, interpolate, pick_unique, realize_grains, resolve_positions,
    select_categories, swap_nth_adjacent_pairs,
    utils::biquad::FilterType,
    write_wav, EffectChain, EffectCycle, EqualEnergyOptions, Error, FeaturePredicate, FeatureSort,
    GrainFeature, GrainRecord, GrainSequence, MemoryCatalogue, OverlapAddMerger, SequenceOptions,
    Sequencer, WavBitDepth, WindowMode,
};

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const SAMPLE_RATE: u32 = 44100;
const GRAIN_FRAMES: usize = 4410;
const CATALOGUE_SIZE: u64 = 400;
const CROSSFADE_FRAMES: usize = 22050;

// -------------------------------------------------------------------------------------------------

/// Arguments for the render example.
#[derive(Args, Debug)]
struct RenderArguments {
    #[arg(short = "o", long = "output")]
    /// Target wav file
    output_path: Option<PathBuf>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level
    log_level: Option<log::Level>,
    #[arg(long = "seed")]
    /// Random seed for deterministic renders
    seed: Option<u64>,
    #[arg(long = "channels")]
    /// Output channel count (default: 2)
    channels: Option<usize>,
    #[arg(long = "grains")]
    /// Unique grains per category (default: 12)
    grains: Option<usize>,
    #[arg(long = "spacing")]
    /// Spacing between grains in frames (default: -2205)
    spacing: Option<i64>,
    #[arg(long = "bit-depth")]
    /// Wav sample format: 16, 24 or 32 (default: 32)
    bit_depth: Option<WavBitDepth>,
}

// -------------------------------------------------------------------------------------------------

/// Catalogue of unrealized grain records with random frequency and flatness features.
fn synthesize_catalogue(rng: &mut impl Rng) -> Result<MemoryCatalogue, Error> {
    let mut catalogue = MemoryCatalogue::default();
    for id in 0..CATALOGUE_SIZE {
        let file = format!("synth-{id}.wav");
        let record = GrainRecord::new(id, file, 0, GRAIN_FRAMES, SAMPLE_RATE)?
            .with_feature(GrainFeature::Frequency, rng.random_range(60.0..2000.0))
            .with_feature(GrainFeature::SpectralFlatness, rng.random_range(0.0..1.0));
        catalogue.push(record);
    }
    Ok(catalogue)
}

/// Sample provider which synthesizes a grain's samples from its features: a sine at the grain's
/// frequency, blended with noise by its flatness.
fn synthesize_samples(record: &GrainRecord) -> Result<Arc<Vec<f32>>, Error> {
    let frequency = record.feature(GrainFeature::Frequency).unwrap_or(440.0) as f64;
    let flatness = record.feature(GrainFeature::SpectralFlatness).unwrap_or(0.0);
    let mut noise = SmallRng::seed_from_u64(record.id());
    let samples = (0..record.frame_count())
        .map(|frame| {
            let phase = 2.0 * PI * frequency * frame as f64 / record.sample_rate() as f64;
            let tone = phase.sin() as f32;
            tone * (1.0 - flatness) + noise.random_range(-1.0..1.0) * flatness
        })
        .collect();
    Ok(Arc::new(samples))
}

/// Sequence one category of grains.
fn sequence_category(
    records: Vec<GrainRecord>,
    sequencer: &Sequencer,
    args: &RenderArguments,
    rng: &mut SmallRng,
) -> Result<GrainSequence, Error> {
    let mut provider = synthesize_samples;
    let picked = pick_unique(&records, args.grains.unwrap_or(12), rng)?;
    let pool = realize_grains(picked, &mut provider)?;
    let mut sequence = sequencer.stochastic(&pool, 4, rng)?;
    swap_nth_adjacent_pairs(&mut sequence, 3)?;
    Ok(sequence)
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    // Parse args and init logger
    let args = parse_args::<RenderArguments>();
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        // disable logging in chatty modules
        .with_module_level("symphonia_core", log::LevelFilter::Warn)
        .with_module_level("symphonia_format", log::LevelFilter::Warn)
        .init()
        .expect("Failed to set logger");

    let channel_count = args.channels.unwrap_or(2).max(1);
    let mut rng = SmallRng::seed_from_u64(args.seed.unwrap_or(0));

    // Query three frequency categories from the catalogue
    let catalogue = synthesize_catalogue(&mut rng)?;
    let predicates = [
        FeaturePredicate::new().between(GrainFeature::Frequency, 60.0, 250.0),
        FeaturePredicate::new().between(GrainFeature::Frequency, 250.0, 800.0),
        FeaturePredicate::new()
            .between(GrainFeature::Frequency, 800.0, 2000.0)
            .between(GrainFeature::SpectralFlatness, 0.0, 0.5),
    ];
    let mut categories = select_categories(&catalogue, &predicates)?.into_iter();
    let (Some(low), Some(mid), Some(high)) =
        (categories.next(), categories.next(), categories.next())
    else {
        unreachable!("expected one pool per category");
    };

    // Sequencer with a filter and modulation cycle
    let options = SequenceOptions::new()
        .spacing(args.spacing.unwrap_or(-(GRAIN_FRAMES as i64) / 2))
        .level_db(-6.0);
    let sequencer = Sequencer::new(options)?
        .with_chain(EffectChain::new().with(GainEffect::with_gain_db(-3.0)))
        .with_cycle(
            EffectCycle::new()
                .with(IdentityEffect)
                .with(FilterEffect::new(
                    FilterType::Lowpass,
                    1200.0,
                    4,
                    SAMPLE_RATE,
                )?)
                .with(AmplitudeModulationEffect::new(
                    vec![
                        ModulationPartial::new(12.0, 0.5, 0.5),
                        ModulationPartial::new(3.0, 0.25, 0.0),
                    ],
                    SAMPLE_RATE,
                )?),
        );

    // Morph from the low into the mid category
    let low = sequence_category(low, &sequencer, &args, &mut rng)?;
    let mid = sequence_category(mid, &sequencer, &args, &mut rng)?;
    let mut morph = interpolate(low, mid, None);
    assign_channels(&mut morph, channel_count, 0)?;
    resolve_positions(&mut morph);

    // High category sorted by brightness
    let mut provider = synthesize_samples;
    let high_pool = realize_grains(
        pick_unique(&high, args.grains.unwrap_or(12), &mut rng)?,
        &mut provider,
    )?;
    let sort = FeatureSort::new(vec![GrainFeature::SpectralFlatness, GrainFeature::Frequency]);
    let mut sorted = sequencer.by_features(&high_pool, &sort)?;
    assign_channels(&mut sorted, channel_count, 1)?;
    resolve_positions(&mut sorted);

    // Merge, concat and level
    let merger = OverlapAddMerger::new(channel_count)?.with_window(WindowMode::Hann);
    let rendered = [
        merger.merge_sequence(&morph)?.into_planar(),
        merger.merge_sequence(&sorted)?.into_planar(),
    ];
    let signal = crossfade_concat(&rendered, CROSSFADE_FRAMES)?;
    let mut signal = force_equal_energy(&signal, EqualEnergyOptions::default())?;
    signal.fade_in(&WindowMode::Hann, CROSSFADE_FRAMES);
    signal.fade_out(&WindowMode::Hann, CROSSFADE_FRAMES);
    signal.adjust_level(-1.0);

    // Write
    let output_path = args
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("render-grains.wav"));
    write_wav(
        &output_path,
        &signal,
        SAMPLE_RATE,
        args.bit_depth.unwrap_or_default(),
    )?;
    println!(
        "Rendered {:.1} seconds into '{}'",
        signal.frame_count() as f64 / SAMPLE_RATE as f64,
        output_path.display()
    );
    Ok(())
}
