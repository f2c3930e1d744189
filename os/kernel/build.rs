use std::env;
use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;

include!("src/user_layout.rs");

/// Writes `user_layout.h` into the output directory, so that C code and
/// user space runtimes share the layout constants with the kernel.
fn generate_layout_header() -> io::Result<()> {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is not set");
    let dest_path = Path::new(&out_dir).join("user_layout.h");
    let mut file = File::create(dest_path)?;

    let constants = [
        ("USER_TEXT_TOP", USER_TEXT_TOP),
        ("USER_STACK_BOTTOM", USER_STACK_BOTTOM),
        ("USER_VADDR_LIMIT", USER_VADDR_LIMIT),
        ("HEAP_GUARD_GAP", HEAP_GUARD_GAP),
    ];

    writeln!(file, "/* Generated from src/user_layout.rs, do not edit. */")?;
    writeln!(file, "#ifndef USER_LAYOUT_H")?;
    writeln!(file, "#define USER_LAYOUT_H")?;
    writeln!(file)?;
    for (name, value) in constants {
        writeln!(file, "#define {} 0x{:x}", name, value)?;
    }
    writeln!(file)?;
    writeln!(file, "#endif")?;

    Ok(())
}

fn main() {
    // Write build information to a file
    built::write_built_file().expect("Failed to acquire build-time information");

    // Generate the layout header
    generate_layout_header().expect("Failed to generate user layout header");
    println!("cargo:rerun-if-changed=src/user_layout.rs");
}
