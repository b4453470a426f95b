/// Display version information
pub fn execute() {
    println!("daobase {}", env!("CARGO_PKG_VERSION"));
    println!("Permission and voting engine for small DAOs");
}
