//! Design-candidate evolution: enumeration registry, DNA derivation,
//! constrained generation with repair, scoring, selection, and the
//! preference-driven stream.

pub mod board;
pub mod candidate;
pub mod dna;
pub mod engine;
pub mod params;
pub mod preferences;
pub mod registry;
pub mod rng;
pub mod scoring;
pub mod selection;
pub mod stream;
pub mod types;

pub use dna::{build_design_dna, token_patch};
pub use engine::EvolutionEngine;
pub use preferences::{DerivedConfig, PreferenceEvent, derive_generation_config};
pub use registry::{ENUM_CATALOG, EnumCatalog, ParamAxis};
pub use stream::{
    ChannelEventSink, CollectingEventSink, EventSink, EvolutionEvent, JsonLinesSink,
    StreamRequest, run_evolution_stream,
};
pub use types::*;
