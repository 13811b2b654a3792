// Domain layer: shipment models and ports (interfaces). No IO here.

pub mod model;
pub mod ports;
