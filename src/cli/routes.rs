//! `routes` command.

use owo_colors::OwoColorize;

use assetline::pipeline::Pipeline;

pub fn print_routes(pipeline: &Pipeline) {
    for line in route_lines(pipeline) {
        println!("{line}");
    }
}

/// `route  content-type  chain  [localized]`, one line per asset.
fn route_lines(pipeline: &Pipeline) -> Vec<String> {
    let width = pipeline
        .assets()
        .iter()
        .map(|a| a.route().len())
        .max()
        .unwrap_or(0);

    pipeline
        .assets()
        .iter()
        .map(|asset| {
            let chain = asset.chain().describe();
            let chain = if chain.is_empty() {
                "-".to_string()
            } else {
                chain.join(" → ")
            };
            let mut line = format!(
                "{:width$}  {}  {}",
                asset.route(),
                asset.content_type().dimmed(),
                chain,
            );
            if asset.is_localized() {
                line.push_str("  [localized]");
            }
            line
        })
        .collect()
}
