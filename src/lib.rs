#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod catalogue;
mod effect;
mod energy;
mod error;
mod grain;
mod interpolate;
mod merge;
mod output;
mod position;
mod realize;
mod sequencer;
mod signal;
mod window;

// public, flat re-exports
pub use error::Error;

pub use grain::{GrainFeature, GrainRecord, GrainSequence, GrainSpan, PlacedGrain};

pub use catalogue::{
    pick_unique, select_categories, FeatureClause, FeaturePredicate, GrainCatalogue,
    MemoryCatalogue,
};

pub use realize::{file::FileSampleProvider, realize_grains, SampleProvider};

pub use sequencer::{
    arrange::{assign_channels, shuffle, swap_nth_adjacent_pairs},
    line, FeatureSort, SequenceOptions, Sequencer, SortPrecedence,
};

pub use position::resolve_positions;

pub use window::{fade_in_curve, fade_out_curve, WindowFunction, WindowMode};

pub use merge::OverlapAddMerger;

pub use interpolate::{default_interpolations, interpolate};

pub use energy::{force_equal_energy, EqualEnergyNormalizer, EqualEnergyOptions};

pub use signal::{crossfade_concat, Signal};

#[cfg(feature = "wav-output")]
pub use output::wav::{write_wav, WavBitDepth};

pub use effect::{Effect, EffectChain, EffectCycle};

// public mods
pub mod utils;

pub mod effects {
    //! Set of basic per grain effect implementations.

    pub use super::effect::{
        chorus::ChorusEffect,
        filter::FilterEffect,
        gain::GainEffect,
        identity::IdentityEffect,
        modulation::{AmplitudeModulationEffect, ModulationPartial},
    };
}
