//! Column-aligned rendering for `depot list` and `depot find`.

use super::{Theme, format_size};
use crossterm::style::Stylize;
use depot_schema::ResourceDescriptor;

/// Print column headers.
pub fn print_header() {
    let theme = Theme::default();
    println!();
    let header = format!(
        "  {:<nw$} {:<vw$} {:<hw$} {:>8}   {}",
        "name",
        "version",
        "hash",
        "cached",
        "repositories",
        nw = theme.name_width,
        vw = theme.version_width,
        hw = theme.hash_width,
    );
    println!("{}", header.dark_grey());
}

/// Print one descriptor. `cached` is the size of the cached file, if any.
pub fn print_row(rd: &ResourceDescriptor, cached: Option<u64>) {
    let theme = Theme::default();

    let name = format!("{:<width$}", rd.name, width = theme.name_width);
    let version = format!("{:<width$}", rd.version, width = theme.version_width);
    let hex = rd.id.to_hex();
    let hash = format!("{:<width$}", &hex[..theme.hash_width], width = theme.hash_width);
    let size = format!("{:>8}", cached.map(format_size).unwrap_or_default());
    let repos: Vec<&str> = rd.repositories.iter().map(String::as_str).collect();

    println!(
        "  {} {} {} {}   {}",
        name.with(theme.name),
        version.with(theme.version),
        hash.with(theme.secondary),
        size.with(theme.secondary),
        repos.join(",").with(theme.secondary)
    );
}

/// Print the summary line.
pub fn print_footer(count: usize, cached: usize, total_size: u64) {
    println!();
    let msg = format!(
        "  {count} resources, {cached} cached ({})",
        format_size(total_size)
    );
    println!("{}", msg.dark_grey());
}
