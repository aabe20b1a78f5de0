pub mod bot_rollup;
pub mod feed_import;
pub mod feed_parsers;
pub mod heartbeat;
pub mod notifier;
pub mod probe;
pub mod sweep;
pub mod transition;
pub mod visibility;
