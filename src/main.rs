fn main() {
  if let Err(e) = quicksetup_lib::run() {
    eprintln!("quicksetup: {}", e);
    std::process::exit(1);
  }
}
