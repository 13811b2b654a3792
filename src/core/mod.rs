pub mod dangerous_goods;
pub mod etl;
pub mod evaluate;
pub mod extraction;
pub mod multi_shipment;
pub mod numeric;
pub mod pipeline;
pub mod port_matcher;
pub mod postprocess;
pub mod reference;

pub use crate::domain::model::{ShipmentRecord, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Extractor, Pipeline, Storage};
pub use crate::utils::error::Result;
