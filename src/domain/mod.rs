// Domain layer: dataset/run models and the platform port. Adapters live under src/adapters.

pub mod model;
pub mod ports;
