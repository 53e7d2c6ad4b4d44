// Audio Processing Module
//
// - resampling.rs: Sample rate conversion

pub mod resampling;

pub use resampling::{create_resampler, sinc_parameters};
