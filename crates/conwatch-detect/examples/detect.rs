//! Run with: cargo run -p conwatch-detect --example detect -- page.json
//!
//! Scores every video in a page snapshot and prints the winner's metadata.

use conwatch_detect::{PageObserver, PageSnapshot};

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: detect <snapshot.json>");
        std::process::exit(2);
    };

    let json = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot read {path}: {e}");
            std::process::exit(1);
        }
    };
    let page = match PageSnapshot::from_json(&json) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("invalid snapshot: {e}");
            std::process::exit(1);
        }
    };

    let viewport = page.viewport();
    for video in &page.videos {
        println!("{:<16} score {:.1}", video.id, conwatch_detect::score(video, viewport));
    }

    match conwatch_detect::main_video(&page) {
        Some(video) => {
            let meta = conwatch_detect::extract(Some(&video), &page);
            println!();
            println!("Video:   {}", video.id);
            println!("  Title:   {}", meta.title);
            if !meta.episode.is_empty() {
                println!("  Episode: {}", meta.episode);
            }
            println!("  Favicon: {}", meta.favicon);
        }
        None => println!("No video detected."),
    }
}
