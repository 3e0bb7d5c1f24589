use anyhow::{Context, Result};
use coursemark_config::Config;
use coursemark_engine::progress::mapping::build_chapter_mapping;
use coursemark_engine::{
    CourseContent, FsContentStore, MarkdownRenderer, OutlineItem, parse_outline,
};
use std::sync::Arc;
use std::{env, path::PathBuf, process};

fn main() -> Result<()> {
    env_logger::init();

    let mut args: Vec<String> = env::args().collect();
    let html = if let Some(pos) = args.iter().position(|a| a == "--html") {
        args.remove(pos);
        true
    } else {
        false
    };

    if args.len() != 2 {
        eprintln!("Usage: {} [--html] <course-id | markdown-file>", args[0]);
        eprintln!();
        eprintln!(
            "A numeric course id is fetched from the content root configured at {}",
            Config::config_path().display()
        );
        eprintln!("anything else is treated as a path to a markdown file.");
        process::exit(1);
    }

    let markdown = match args[1].parse::<u64>() {
        Ok(course_id) => load_course(course_id)?,
        Err(_) => {
            let path = PathBuf::from(&args[1]);
            std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?
        }
    };

    if html {
        print!("{}", MarkdownRenderer::new().render(&markdown));
    } else {
        print_outline(&markdown);
    }

    Ok(())
}

fn load_course(course_id: u64) -> Result<String> {
    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => {
            eprintln!(
                "Error: No config file found at {}",
                Config::config_path().display()
            );
            eprintln!("Create one with a content_root entry, or pass a markdown file path.");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let store = Arc::new(FsContentStore::new(config.content_root));
    let mut content = CourseContent::new(store, course_id);
    content.load();
    Ok(content.markdown().to_string())
}

/// Print the chapter tree with positional keys, anchor ids and source lines.
fn print_outline(markdown: &str) {
    let outline = parse_outline(markdown);
    if outline.is_empty() {
        println!("(no headings)");
        return;
    }

    let mapping = build_chapter_mapping(&outline);
    print_items(&outline, 0, &mapping);
}

fn print_items(
    items: &[OutlineItem],
    depth: usize,
    mapping: &std::collections::HashMap<String, coursemark_engine::ChapterInfo>,
) {
    for item in items {
        let indent = "  ".repeat(depth);
        let key = mapping
            .get(&item.id)
            .map(|info| info.key.as_str())
            .unwrap_or("?");
        println!(
            "{indent}{key} {} (#{}, line {})",
            item.content,
            item.id,
            item.line_number + 1
        );
        print_items(&item.children, depth + 1, mapping);
    }
}
