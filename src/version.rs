const fn unwrap_or_cargo_version(opt: Option<&'static str>) -> &'static str {
    match opt {
        Some(val) => val,
        None => env!("CARGO_PKG_VERSION"),
    }
}

/// Release version stamped at build time through `BILLBOARD_VERSION`, or the crate version.
pub const VERSION: &str = unwrap_or_cargo_version(option_env!("BILLBOARD_VERSION"));
