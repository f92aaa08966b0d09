fn main() {
    // Configure FFmpeg paths for macOS (Homebrew installation)
    #[cfg(target_os = "macos")]
    {
        for prefix in ["/opt/homebrew/lib", "/usr/local/lib"] {
            if std::path::Path::new(prefix).join("libavcodec.dylib").exists() {
                println!("cargo:rustc-link-search={}", prefix);
                println!("cargo:rustc-link-lib=dylib=avcodec");
                println!("cargo:rustc-link-lib=dylib=avformat");
                println!("cargo:rustc-link-lib=dylib=avutil");
                println!("cargo:rustc-link-lib=dylib=swscale");
                break;
            }
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
}
