fn main() {
    // Tell Cargo to rerun if the linker script changes
    println!("cargo:rerun-if-changed=kernel.ld");
}
