//! Embedded assets baked into the binary.
//!
//! The default rubric ships inside the executable so a fresh install can run an audit
//! without any files on disk.

use rust_embed::RustEmbed;

pub const RUBRIC_ASSET: &str = "rubric.toml";

#[derive(RustEmbed)]
#[folder = "assets/"]
#[include = "*.toml"]
struct Assets;

pub fn get_asset(name: &str) -> Option<String> {
    Assets::get(name).map(|file| String::from_utf8_lossy(&file.data).into_owned())
}

pub fn list_assets() -> Vec<String> {
    Assets::iter().map(|name| name.into_owned()).collect()
}
