pub mod feature;
pub mod issue;
pub mod project;
pub mod team;
pub mod throughput;
pub mod update;
