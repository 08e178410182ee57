//! File format parsers and writers.

pub mod drawable;
pub mod fragment;
pub mod xml;
