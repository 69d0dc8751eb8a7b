//! Steps concretos de demo: ejercitan las tres formas de fan-out y la fase
//! de finalize del contrato `BuildStep`.

mod entity_nodes;
mod geometry;
mod materials;
mod parse;

pub use entity_nodes::EntityNodeStep;
pub use geometry::BrushGeometryStep;
pub use materials::MaterialResolveStep;
pub use parse::ParseMapStep;
