//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod indicator;
pub mod reader;

pub use indicator::{MockIndicator, MockIndicatorHandle};
pub use reader::{MockTagReader, MockTagReaderHandle, SimulatedTag, WriteRecord};
