// Domain layer: core models, ports and the pure processing stages. No I/O here.

pub mod model;
pub mod ports;

pub mod services;
