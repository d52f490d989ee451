// Front end of the q3trace tool: command line and benchmark harness.

pub mod bench;
pub mod config;
