//! Object name arguments: `123`, `123.wem`, `dir/123.wem`, or `[file]`.

use std::path::Path;

use anyhow::Context;
use bnk_format::WemId;

/// Expand every `[file]` argument into the whitespace-separated names it
/// contains. Other arguments pass through unchanged.
pub fn expand_names(items: &[String]) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        match item.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(list) => {
                let text = std::fs::read_to_string(list)
                    .with_context(|| format!("reading name list {list}"))?;
                names.extend(text.split_whitespace().map(str::to_owned));
            }
            None => names.push(item.clone()),
        }
    }
    Ok(names)
}

/// Object id from a name: the file stem as a decimal u32.
pub fn parse_id(name: &str) -> Option<WemId> {
    Path::new(name)
        .file_stem()?
        .to_str()?
        .parse::<u32>()
        .ok()
        .map(WemId)
}
