// Domain layer: entities and the ports the rest of the crate is written against.

pub mod model;
pub mod ports;
