//! Spatial indexing utilities.

mod quadtree;

pub use quadtree::{Bounds, QuadHandle, QuadTree, Quadrant, MAX_ITEMS};
