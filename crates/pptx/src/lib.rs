//! PPTX (Office Open XML) backend for photo roster decks.
//!
//! A roster deck carries one table of `3학년 5반 1번 <name>` cells per slide
//! and the matching student pictures on the same slide.

pub mod parser;

pub use parser::{PhotoRoster, PptxParser, RosterPhotos, RosterSlide, SlidePicture};
