//! Progressive, level-of-detail graph explorer for occupation/skill taxonomies.
//!
//! Data flows from [`dataset`] through the [`engine`] builder into a
//! [`graph::GraphStore`], which a [`render::Renderer`] draws.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod graph;
pub mod layout;
pub mod render;
pub mod util;
