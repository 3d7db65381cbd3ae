//! 模型目录
//!
//! - `parser` - verbose 输出解析
//! - `discovery` - 运行外部命令获取目录

mod discovery;
mod parser;

pub use discovery::{
    CatalogDiscovery, CommandOutput, CommandRunner, ProcessRunner, DEFAULT_DISCOVERY_TIMEOUT,
    DEFAULT_OPENCODE_BINARY, OPENCODE_PATH_ENV,
};
pub use parser::parse_models_verbose_output;
