//! Surface reconstruction from stacked **2D contours**.
//!
//! Each pair of adjacent sections is stitched together with *slice chords*: edges that
//! join a contour vertex on one level to its optimal tiling vertex (OTV) on the other.
//! Chords are inserted over a ladder of progressively looser validity tests, faces are
//! closed around them, and whatever the chords cannot reach is detected as typed
//! regions and closed around a synthesized medial axis.
//!
//! A whole object is described by an [`AnnotationGraph`] of cross-sections. The graph
//! is partitioned into independent two-level [meshing groups](grouping::MeshingGroup),
//! which are tiled concurrently and merged into one [`SurfaceMesh`] per connected
//! component.
//!
//! ```
//! use contour_tiler::{AnnotationGraph, TilingParams, reconstruct};
//! use geo::polygon;
//!
//! let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
//! let mut graph = AnnotationGraph::new();
//! graph.add_node(1, 0.0, square.clone());
//! graph.add_node(2, 1.0, square);
//! graph.add_edge(1, 2).unwrap();
//!
//! let surfaces = reconstruct(&graph, &TilingParams::default()).unwrap();
//! assert_eq!(surfaces.len(), 1);
//! ```
//!
//! # Features
//! #### Default
//! - **parallel**: use rayon to tile meshing groups concurrently

#![forbid(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod cap;
pub mod chord;
pub mod classify;
pub mod config;
pub mod contour;
pub mod errors;
pub mod float_types;
pub mod grouping;
pub mod medial_axis;
pub mod mesh;
pub mod pipeline;
pub mod region;

pub use config::TilingParams;
pub use contour::{ContourIndex, ContourSet};
pub use errors::{MeshError, MeshResult};
pub use grouping::{AnnotationGraph, MeshingGroup};
pub use mesh::SliceMesh;
pub use mesh::surface::SurfaceMesh;
pub use pipeline::{mesh_contours, reconstruct};
pub use region::{Region, RegionKind};
