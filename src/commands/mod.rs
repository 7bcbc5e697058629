pub mod base_commands;
pub mod how_many_cmd;
pub mod report_format;
pub mod serve_cmd;
pub mod when_cmd;
