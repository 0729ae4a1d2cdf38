pub mod search_commands;
pub mod stats_commands;
pub mod watch_commands;
