// Meeting Coach - live negotiation coaching from microphone audio
//
// Two agents cooperate on one session:
// - a perception agent streaming audio over Gemini Live (transcript + speaker tools)
// - a reasoning agent producing structured advice from recent turns

// Performance logging macros - exported for use by other modules
#[macro_use]
pub mod macros;

pub mod config;
pub mod localization;
pub mod prompts;

// Core modules
pub mod audio;
pub mod coach;
pub mod llm_engine;
pub mod perception;
pub mod session;

pub mod console;

use anyhow::Result;
use log::info;

pub use config::CoachConfig;
pub use session::{spawn_session, CoachEvent, CoachSession, SessionHandle};

// ============== Main App Entry ==============

pub fn run() -> Result<()> {
    // Initialize env_logger to output to stderr (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = CoachConfig::from_env()?;
    info!("Meeting coach starting (language: {})", config.language);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("coach-worker")
        .build()?;

    runtime.block_on(console::run_console(config))
}
