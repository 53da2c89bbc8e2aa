//! Boussinesq compliance rows for elastic half-space contact.
//!
//! For a triangulated surface and an evaluation point, [`solver::compute_row`]
//! returns one coefficient per mesh node relating a unit pressure at that
//! node to the normal displacement of the evaluation point. Each triangle is
//! integrated exactly in a local frame built around the projection of the
//! evaluation point.

pub mod datatypes;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod geometry;
pub mod integrals;
pub mod loader;
pub mod post_processor;
pub mod solver;
pub mod volume;

pub use datatypes::{DegeneracyPolicy, MaterialProperties, Mesh, ModelMetadata, Triangle};
pub use diagnostics::{DegeneracyReport, DiagnosticSink, FileSink, LogSink, MemorySink};
pub use element::{AnalyticTriangleCompliance, TriangleCompliance};
pub use error::BoussinesqError;
pub use geometry::{area_vector_3d, orientation_2d, signed_area_2d, LocalFrame, Orientation};
pub use solver::{compute_row, ComplianceAssembler};
