pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use config::toml_config::TomlConfig;
pub use core::{
    etl::EtlEngine, evaluate::Evaluator, pipeline::ShipmentPipeline, port_matcher::PortMatcher,
    postprocess::PostProcessor, reference::ReferenceIndex,
};
pub use utils::error::{EtlError, Result};
