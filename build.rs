fn main() {
    // tauri codegen only applies to the desktop shell
    if std::env::var_os("CARGO_FEATURE_DESKTOP").is_some() {
        tauri_build::build()
    }
}
