// Domain layer: core models and ports (interfaces) shared by the clients and the engine.

pub mod model;
pub mod ports;
