//! Scene builders shared by unit tests, integration tests and the demo.

pub mod geometry;
