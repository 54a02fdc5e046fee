mod registry;

pub use registry::PlacementRegistry;
