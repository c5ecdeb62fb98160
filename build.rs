//! Build script for ferroblacs
//!
//! This script only does work when the `native` feature is enabled:
//! 1. Finds a BLACS installation (usually bundled inside ScaLAPACK)
//! 2. Finds the MPI library BLACS is layered on
//! 3. Emits the link directives for both

use std::env;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=BLACS_PKG_CONFIG");
    println!("cargo:rerun-if-env-changed=BLACS_LIB_DIR");
    println!("cargo:rerun-if-env-changed=BLACS_LIBS");
    println!("cargo:rerun-if-env-changed=MPI_PKG_CONFIG");

    // The loopback backend needs no native library
    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    let blacs = find_blacs_config();
    let mpi = find_mpi_config();

    for config in [&blacs, &mpi] {
        for path in &config.link_paths {
            println!("cargo:rustc-link-search=native={}", path.display());
            // Add RPATH so the binary finds the same libraries at runtime
            println!("cargo:rustc-link-arg=-Wl,-rpath,{}", path.display());
        }
    }

    // BLACS must come before MPI on the link line
    for lib in blacs.libs.iter().chain(&mpi.libs) {
        println!("cargo:rustc-link-lib={lib}");
    }

    if let Some(version) = blacs.version {
        println!("cargo:rustc-env=BLACS_VERSION={version}");
    }
}

struct LinkConfig {
    link_paths: Vec<PathBuf>,
    libs: Vec<String>,
    version: Option<String>,
}

fn find_blacs_config() -> LinkConfig {
    // Strategy 1: Use BLACS_PKG_CONFIG environment variable
    if let Ok(pkg_name) = env::var("BLACS_PKG_CONFIG") {
        if let Ok(config) = try_pkg_config(&pkg_name) {
            eprintln!("Found BLACS via BLACS_PKG_CONFIG={pkg_name}");
            return config;
        }
    }

    // Strategy 2: Try common pkg-config names
    for pkg_name in &["scalapack-openmpi", "scalapack-mpich", "scalapack"] {
        if let Ok(config) = try_pkg_config(pkg_name) {
            eprintln!("Found BLACS via pkg-config: {pkg_name}");
            return config;
        }
    }

    // Strategy 3: Explicit library directory and names
    if let Ok(dir) = env::var("BLACS_LIB_DIR") {
        let libs = env::var("BLACS_LIBS").unwrap_or_else(|_| "scalapack".to_string());
        eprintln!("Using BLACS from BLACS_LIB_DIR={dir}");
        return LinkConfig {
            link_paths: vec![PathBuf::from(dir)],
            libs: parse_lib_list(&libs),
            version: None,
        };
    }

    // Strategy 4: Try common installation paths
    for dir in &[
        "/usr/lib/x86_64-linux-gnu",
        "/usr/lib64",
        "/usr/lib",
        "/usr/local/lib",
        "/opt/scalapack/lib",
    ] {
        for lib in &["scalapack-openmpi", "scalapack-mpich", "scalapack"] {
            let path = PathBuf::from(dir);
            if path.join(format!("lib{lib}.so")).exists() || path.join(format!("lib{lib}.a")).exists()
            {
                eprintln!("Found BLACS ({lib}) in {dir}");
                return LinkConfig {
                    link_paths: vec![path],
                    libs: vec![lib.to_string()],
                    version: None,
                };
            }
        }
    }

    panic!(
        "Could not find a BLACS installation. Please ensure ScaLAPACK (or a standalone BLACS) is installed and either:\n\
         - Set BLACS_PKG_CONFIG to the pkg-config name (e.g., 'scalapack-openmpi')\n\
         - Set BLACS_LIB_DIR (and optionally BLACS_LIBS, comma separated) to the library location"
    );
}

fn find_mpi_config() -> LinkConfig {
    if let Ok(pkg_name) = env::var("MPI_PKG_CONFIG") {
        if let Ok(config) = try_pkg_config(&pkg_name) {
            eprintln!("Found MPI via MPI_PKG_CONFIG={pkg_name}");
            return config;
        }
    }

    for pkg_name in &["mpich", "ompi", "mpi"] {
        if let Ok(config) = try_pkg_config(pkg_name) {
            eprintln!("Found MPI via pkg-config: {pkg_name}");
            return config;
        }
    }

    if let Ok(config) = try_mpicc() {
        eprintln!("Found MPI via mpicc");
        return config;
    }

    // Some ScaLAPACK builds already carry their MPI dependency
    eprintln!("MPI not found separately; relying on the BLACS library's own dependencies");
    LinkConfig {
        link_paths: Vec::new(),
        libs: Vec::new(),
        version: None,
    }
}

fn parse_lib_list(libs: &str) -> Vec<String> {
    libs.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_start_matches("-l").to_string())
        .collect()
}

fn try_pkg_config(name: &str) -> Result<LinkConfig, pkg_config::Error> {
    let lib = pkg_config::Config::new()
        .cargo_metadata(false) // We'll handle linking ourselves
        .probe(name)?;

    Ok(LinkConfig {
        link_paths: lib.link_paths,
        libs: lib.libs,
        version: Some(lib.version),
    })
}

fn try_mpicc() -> Result<LinkConfig, String> {
    let mpicc = env::var("MPICC").unwrap_or_else(|_| "mpicc".to_string());

    let output = Command::new(&mpicc)
        .arg("-show")
        .output()
        .map_err(|e| format!("Failed to run '{mpicc}': {e}"))?;

    if !output.status.success() {
        return Err("mpicc -show failed".to_string());
    }

    let show_output = String::from_utf8_lossy(&output.stdout);
    Ok(parse_mpicc_show(&show_output))
}

fn parse_mpicc_show(output: &str) -> LinkConfig {
    let mut link_paths = Vec::new();
    let mut libs = Vec::new();

    for part in output.split_whitespace() {
        if let Some(path) = part.strip_prefix("-L") {
            link_paths.push(PathBuf::from(path));
        } else if let Some(lib) = part.strip_prefix("-l") {
            libs.push(lib.to_string());
        }
    }

    if libs.is_empty() {
        libs.push("mpi".to_string());
    }

    LinkConfig {
        link_paths,
        libs,
        version: None,
    }
}
