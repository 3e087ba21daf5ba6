pub mod algo;
pub mod apply;
pub mod config;
pub mod error;
pub mod ops;
pub mod plan;
pub mod reader;
pub mod tree;

#[cfg(feature = "plugin")]
pub mod commands;

#[cfg(feature = "plugin")]
use nu_plugin::{Plugin, PluginCommand};

#[cfg(feature = "plugin")]
pub struct FoldersPlugin;

#[cfg(feature = "plugin")]
impl Plugin for FoldersPlugin {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").into()
    }

    fn commands(&self) -> Vec<Box<dyn PluginCommand<Plugin = Self>>> {
        vec![
            Box::new(commands::Plan),
            Box::new(commands::Apply),
            Box::new(commands::Render),
            Box::new(commands::Misc),
            Box::new(commands::Group),
        ]
    }
}
