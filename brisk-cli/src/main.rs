use anyhow::{Context, Result};
use brisk_compiler::config::MANIFEST_FILE;
use brisk_compiler::resolver::{
    derive_module_path, find_implementation, find_interface, resolve_import, ModulePath,
    SearchPath,
};
use brisk_compiler::{AstFrontend, CompilerOptions, ExportContext, ModuleResolver};
use brisk_diagnostics::DiagnosticEngine;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "brisk")]
#[command(version = "0.2.0")]
#[command(about = "Brisk module resolver and interface checker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where sources live; flags override values from the manifest
#[derive(Args)]
struct SourceArgs {
    /// Package manifest, defaults to ./brisk.json when present
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Source root that module paths are derived from
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Implementation search path, directories separated by ';'
    #[arg(long, value_name = "DIRS")]
    source_path: Option<String>,

    /// Interface search path for other packages, directories separated by ';'
    #[arg(long, value_name = "DIRS")]
    interface_path: Option<String>,

    /// Name of the package being compiled
    #[arg(long, value_name = "NAME")]
    package: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and check a module and everything it imports
    Check {
        /// Serialized compilation unit (.brk)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        sources: SourceArgs,

        /// Print diagnostics and exports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve an import path against the importing module
    Resolve {
        /// Import path, e.g. ../io/adc or @util/vec
        #[arg(value_name = "IMPORT")]
        import: String,

        /// Importing module, e.g. ctrl/pid or @plant/ctrl/pid
        #[arg(long, value_name = "MODULE")]
        from: String,
    },

    /// Find the file of a module on the search path
    Locate {
        /// Module path, e.g. io/adc or @util/vec
        #[arg(value_name = "MODULE")]
        module: String,

        #[command(flatten)]
        sources: SourceArgs,

        /// Search for the interface file instead of the implementation
        #[arg(long)]
        interface: bool,
    },

    /// Derive the module path of a source file
    Name {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        sources: SourceArgs,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            input,
            sources,
            json,
        } => {
            let options = sources.options()?;
            log::debug!(
                "checking {} (source path '{}', interface path '{}')",
                input.display(),
                options.source_path,
                options.interface_path
            );
            let resolver = ModuleResolver::new(options, AstFrontend);

            match resolver.compile_file(&input) {
                Ok(info) => {
                    if json {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&info.exports)
                                .context("Failed to serialize exports")?
                        );
                    } else {
                        let resolved = resolver.cache().len();
                        println!("✅ {} ({} module(s) resolved)", info.path, resolved);
                        print_exports(&info.exports);
                    }
                    Ok(())
                }
                Err(diagnostics) => {
                    let mut engine = DiagnosticEngine::new();
                    engine.extend(diagnostics);
                    if json {
                        let report = engine.to_json().context("Failed to serialize diagnostics")?;
                        println!("{}", report);
                    } else {
                        engine.print_all(|file| std::fs::read_to_string(file).ok());
                        engine.print_summary();
                    }
                    anyhow::bail!("check failed with {} error(s)", engine.error_count())
                }
            }
        }
        Commands::Resolve { import, from } => {
            let current = from
                .parse::<ModulePath>()
                .with_context(|| format!("Invalid module path '{}'", from))?;
            let resolved = resolve_import(&current, &import)
                .with_context(|| format!("Cannot resolve '{}' from {}", import, current))?;
            println!("{}", resolved);
            Ok(())
        }
        Commands::Locate {
            module,
            sources,
            interface,
        } => {
            let options = sources.options()?;
            let path = module
                .parse::<ModulePath>()
                .with_context(|| format!("Invalid module path '{}'", module))?;

            let found = if interface {
                find_interface(&path, &options.interface_path)
            } else {
                find_implementation(&path, &options.source_path)
            };
            match found {
                Ok(file) => {
                    println!("{}", file.display());
                    Ok(())
                }
                Err(tried) => {
                    eprintln!("❌ Module {} not found, tried:", path);
                    for candidate in &tried {
                        eprintln!("   {}", candidate.display());
                    }
                    anyhow::bail!("module {} not found", path)
                }
            }
        }
        Commands::Name { input, sources } => {
            let options = sources.options()?;
            let package = options.package.as_deref();
            let path = derive_module_path(&input, &options.source_root, package)
                .with_context(|| format!("Cannot name {}", input.display()))?;
            println!("{}", path);
            println!("  implementation: {}", path.implementation_file_name().display());
            println!("  interface:      {}", path.interface_file_name().display());
            println!("  C source:       {}", path.c_file_name().display());
            println!("  C header:       {}", path.h_file_name().display());
            println!("  C prefix:       {}", path.c_name());
            Ok(())
        }
    }
}

impl SourceArgs {
    fn options(&self) -> Result<CompilerOptions> {
        // Fall back to a manifest in the working directory
        let manifest = self.manifest.clone().or_else(|| {
            let default = Path::new(MANIFEST_FILE);
            default.is_file().then(|| default.to_path_buf())
        });

        let mut options = match &manifest {
            Some(manifest) => CompilerOptions::from_manifest(manifest)?,
            None => CompilerOptions::default(),
        };

        if let Some(root) = &self.root {
            options.source_root = root.clone();
            if self.source_path.is_none() && manifest.is_none() {
                options.source_path = SearchPath::new(vec![root.clone()]);
            }
        }
        if let Some(source_path) = &self.source_path {
            options.source_path = SearchPath::parse(source_path);
        }
        if let Some(interface_path) = &self.interface_path {
            options.interface_path = SearchPath::parse(interface_path);
        }
        if let Some(package) = &self.package {
            options = options.with_package(package.as_str())?;
        }

        Ok(options)
    }
}

fn print_exports(exports: &ExportContext) {
    println!("exports: {}", join(exports.export_scope.iter()));

    if !exports.required_imports.is_empty() {
        println!("required imports:");
        for (name, owner) in &exports.required_imports {
            match owner {
                Some(module) => println!("  {} (from {})", name, module),
                None => println!("  {}", name),
            }
        }
    }
    if !exports.opaque_types.is_empty() {
        println!("opaque types: {}", join(exports.opaque_types.keys()));
    }
    for (name, signature) in &exports.singleton_signatures {
        let usages: Vec<String> = signature
            .usages
            .iter()
            .map(|captures| format!("[{}]", captures.join(", ")))
            .collect();
        println!("singleton {} {:?}: {}", name, signature.tag, usages.join(" "));
    }
    if !exports.internal_imports.is_empty() {
        let internal: Vec<String> = exports
            .internal_imports
            .iter()
            .map(|(alias, kind)| format!("{} ({:?})", alias, kind))
            .collect();
        println!("internal imports: {}", internal.join(", "));
    }
}

fn join<'a>(names: impl Iterator<Item = &'a String>) -> String {
    names.map(String::as_str).collect::<Vec<_>>().join(", ")
}
