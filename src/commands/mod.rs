mod config_cmd;
mod shopping;

pub use config_cmd::ConfigCommand;
pub use shopping::ShoppingSubcommand;
