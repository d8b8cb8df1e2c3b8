// Boundary with the rendering engine and the AR session.

pub mod events;
pub mod graph;
pub mod transform;
