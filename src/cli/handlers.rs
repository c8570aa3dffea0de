// FILE: src/cli/handlers.rs
use crate::{
    analyze_source, cli::OutputFormat, compile_file_with_options, compile_source_with_options, engine,
    CompilationStats, CompilerError, CompilerOptions, FileSystemLoader, Result,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Instant;

fn required_input(matches: &clap::ArgMatches) -> Result<&String> {
    matches.get_one::<String>("input").ok_or_else(|| CompilerError::InvalidFormat {
        message: "missing input path".to_string(),
    })
}

// --- COMPILE ---
pub fn handle_compile_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required_input(matches)?;
    let output_path = matches.get_one::<String>("output").cloned().or_else(|| {
        cli.output_directory().and_then(|dir| {
            Path::new(input_path)
                .file_name()
                .map(|name| Path::new(dir).join(name).to_string_lossy().into_owned())
        })
    });

    let options = cli.build_compiler_options(matches)?;

    if matches.get_flag("watch") {
        watch_and_compile(input_path, output_path.as_deref(), options)
    } else {
        let stats = compile_once(input_path, output_path.as_deref(), &options)?;
        if matches.get_flag("stats") {
            print_detailed_stats(&stats);
        }
        Ok(())
    }
}

/// Compile to `output_path`, or to stdout when there is none
fn compile_once(input_path: &str, output_path: Option<&str>, options: &CompilerOptions) -> Result<CompilationStats> {
    match output_path {
        Some(output_path) => {
            eprintln!("🔨 Compiling {} -> {}", input_path, output_path);
            let compile_start = Instant::now();
            let stats = compile_file_with_options(input_path, output_path, options)?;
            eprintln!("✅ Compilation successful!");
            eprintln!("   Output: {} bytes", stats.output_size);
            eprintln!("   Time: {:.2}ms", compile_start.elapsed().as_secs_f64() * 1000.0);
            Ok(stats)
        }
        None => {
            let compiled = compile_path(input_path, options)?;
            print!("{}", compiled.output);
            Ok(compiled.stats)
        }
    }
}

/// Read, compile and verify one template without writing anything
fn compile_path(input_path: &str, options: &CompilerOptions) -> Result<crate::CompiledOutput> {
    let start = Instant::now();
    let source = fs::read_to_string(input_path)?;
    let mut compiled = compile_source_with_options(&source, input_path, options)?;
    if options.check_components && !options.template_dirs.is_empty() {
        let loader = FileSystemLoader::new(options.template_dirs.iter().cloned());
        engine::verify_components(&loader, &compiled.components, options)?;
    }
    compiled.stats.compile_time_ms = start.elapsed().as_millis() as u64;
    Ok(compiled)
}

fn watch_and_compile(input_path: &str, output_path: Option<&str>, options: CompilerOptions) -> Result<()> {
    eprintln!("👀 Watching {} for changes...", input_path);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| {
        CompilerError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to create file watcher: {}", e),
        ))
    })?;

    watcher
        .watch(Path::new(input_path), RecursiveMode::NonRecursive)
        .map_err(|e| {
            CompilerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to watch file: {}", e),
            ))
        })?;

    if let Err(e) = compile_once(input_path, output_path, &options) {
        eprintln!("❌ Initial compilation failed: {}", e);
    }

    loop {
        match rx.recv() {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                eprintln!("🔄 File changed, recompiling...");
                match compile_once(input_path, output_path, &options) {
                    Ok(stats) => eprintln!(
                        "✅ Recompiled successfully ({} bytes, {} component call(s))",
                        stats.output_size, stats.component_count
                    ),
                    Err(e) => eprintln!("❌ Compilation failed: {}", e),
                }
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

// --- CHECK ---
pub fn handle_check_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required_input(matches)?;
    let recursive = matches.get_flag("recursive");
    let mut options = cli.build_compiler_options(matches)?;

    if recursive && Path::new(input_path).is_dir() {
        if options.template_dirs.is_empty() {
            options.template_dirs.push(PathBuf::from(input_path));
        }
        check_directory_recursive(input_path, &options)
    } else {
        check_single_file(input_path, &options)
    }
}

fn check_single_file(input_path: &str, options: &CompilerOptions) -> Result<()> {
    match compile_path(input_path, options) {
        Ok(compiled) => {
            println!(
                "✅ {} - No issues found ({} component call(s))",
                input_path, compiled.stats.component_count
            );
            Ok(())
        }
        Err(e) => {
            println!("❌ {} - {}", input_path, e);
            Err(e)
        }
    }
}

fn check_directory_recursive(dir_path: &str, options: &CompilerOptions) -> Result<()> {
    let extension = options.template_extension.trim_start_matches('.');
    let mut total_files = 0;
    let mut error_files = 0;

    for entry in walkdir::WalkDir::new(dir_path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            CompilerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        if entry.file_type().is_file() && entry.path().extension().map_or(false, |ext| ext == extension) {
            total_files += 1;
            let path = entry.path().to_string_lossy();
            if check_single_file(&path, options).is_err() {
                error_files += 1;
            }
        }
    }

    println!("\n📊 Check Summary:");
    println!("   Total files: {}", total_files);
    println!("   Files with errors: {}", error_files);
    if total_files > 0 {
        println!(
            "   Success rate: {:.1}%",
            (total_files - error_files) as f64 / total_files as f64 * 100.0
        );
    }

    if error_files > 0 {
        Err(CompilerError::CheckFailed {
            failed: error_files,
            total: total_files,
        })
    } else {
        Ok(())
    }
}

// --- ANALYZE ---
pub fn handle_analyze_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required_input(matches)?;
    let output_path = matches.get_one::<String>("output");
    let format = matches.get_one::<OutputFormat>("format").unwrap_or(&OutputFormat::Debug);
    let options = cli.build_compiler_options(matches)?;

    eprintln!("🔬 Analyzing {}", input_path);

    let source = fs::read_to_string(input_path)?;
    let analysis = analyze_source(&source, input_path, &options)?;
    let report = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&analysis).map_err(|e| CompilerError::InvalidFormat {
            message: format!("JSON serialization error: {}", e),
        })?,
        OutputFormat::Debug => format!("Template Analysis: {}\n\n{:#?}", input_path, analysis),
    };

    if let Some(output_file) = output_path {
        fs::write(output_file, report)?;
        println!("✅ Analysis saved to {}", output_file);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn print_detailed_stats(stats: &CompilationStats) {
    eprintln!("\n📊 Detailed Compilation Statistics:");
    eprintln!("   Source size: {} bytes", stats.source_size);
    eprintln!("   Output size: {} bytes", stats.output_size);
    eprintln!("   Compile time: {}ms", stats.compile_time_ms);
    eprintln!("\n   Component breakdown:");
    eprintln!("     Component calls: {}", stats.component_count);
    eprintln!("     Named slots: {}", stats.slot_count);
    eprintln!("     Attributes: {}", stats.attribute_count);
    eprintln!("     Block attributes: {}", stats.block_attribute_count);
    if stats.var_count > 0 {
        eprintln!("     Vars: {}", stats.var_count);
    }
}
