//! subgen - turn a video into subtitles
//!
//! The pipeline extracts the audio track, transcribes it with whisper.cpp,
//! optionally translates each segment through a local LLM, writes SubRip
//! subtitles and can burn them into a copy of the video.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod progress;
pub mod request;
pub mod setup;
pub mod subtitle;
pub mod transcribe;
pub mod transcript;
pub mod translate;
pub mod workflow;

#[cfg(test)]
mod testing;
