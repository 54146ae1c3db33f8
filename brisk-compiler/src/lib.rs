pub mod ast_frontend;
pub mod cache;
pub mod config;
pub mod export_inference;
pub mod facts;
pub mod import_checker;
pub mod module_info;
pub mod module_resolver;
pub mod resolver;
pub mod symbols;
pub mod visibility;

pub use ast_frontend::AstFrontend;
pub use cache::CompilationCache;
pub use config::{CompilerOptions, ConfigError, Manifest};
pub use export_inference::{infer_exports, ExportContext, ExportError};
pub use facts::InferenceFacts;
pub use import_checker::{check_imports, ImportChain, ImportError, Imports};
pub use module_info::{CompileFailure, CompileResult, ModuleInfo};
pub use module_resolver::{Frontend, ModuleResolver};
pub use resolver::{ModulePath, SearchPath};
pub use symbols::{SymbolEnv, SymbolTable};
pub use visibility::Visibility;
