/**
 * Module Resolver
 * Module path algebra, import path grammar, search path probing, file names
 */
pub mod import_path;
pub mod module_path;
pub mod search;

pub use import_path::{
    parse_import_path, resolve_against_current, resolve_import, ImportPathError, ImportPrefix,
    ImportTargetError, ParsedImport, ResolveError,
};
pub use module_path::{
    derive_module_path, is_valid_identifier_component, ModuleNameError, ModulePath,
    C_HEADER_EXT, C_SOURCE_EXT, IMPLEMENTATION_EXT, INTERFACE_EXT, RESERVED_WORD,
};
pub use search::{find_implementation, find_interface, search, SearchPath, SEARCH_PATH_SEPARATOR};
