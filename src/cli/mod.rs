//! CLI subcommand bodies, one module per subcommand.

pub mod resolve;
pub mod run;
pub mod zaplink;
