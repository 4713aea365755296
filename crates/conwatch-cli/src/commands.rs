use std::path::Path;

use conwatch_core::format::{display_hostname, format_time, progress_percent};
use conwatch_core::orchestrator::{SaveOutcome, Trigger};
use conwatch_core::resume::{self, ResumeCoordinator, ResumeState};
use conwatch_core::{policy, ConwatchError, Theme, WatchEntry};
use conwatch_detect::{PageObserver, PageSnapshot};
use conwatch_runtime::{Runtime, RuntimeError, TabId, TabInfo};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Core(#[from] ConwatchError),
    #[error("snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Other(String),
}

const CLI_TAB: TabId = TabId(0);

fn load_snapshot(path: &Path) -> Result<PageSnapshot, CliError> {
    let json = std::fs::read_to_string(path).map_err(ConwatchError::from)?;
    PageSnapshot::from_json(&json).map_err(|source| CliError::Snapshot {
        path: path.display().to_string(),
        source,
    })
}

fn print_entry(entry: &WatchEntry) {
    let pin = if entry.pinned { "*" } else { " " };
    let episode = if entry.episode.is_empty() {
        String::new()
    } else {
        format!(" [{}]", entry.episode)
    };
    let progress = if entry.duration > 0.0 {
        format!(
            "{} / {} ({:.0}%)",
            format_time(entry.timestamp),
            format_time(entry.duration),
            progress_percent(entry.timestamp, entry.duration)
        )
    } else {
        "bookmark".to_string()
    };
    println!(
        "{pin} {}{episode}  {progress}  {}\n    {}",
        entry.title,
        display_hostname(&entry.hostname),
        entry.id
    );
}

pub async fn list(rt: &Runtime, filter: &str, json: bool) -> Result<(), CliError> {
    let entries = rt.store().list(filter).await?;
    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::Other(e.to_string()))?;
        println!("{out}");
        return Ok(());
    }
    if entries.is_empty() {
        println!("No entries.");
    }
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

pub async fn pin(rt: &Runtime, id: &str) -> Result<(), CliError> {
    match rt.store().toggle_pin(id).await? {
        Some(true) => println!("Pinned {id}"),
        Some(false) => println!("Unpinned {id}"),
        None => return Err(RuntimeError::NotFound(id.to_string()).into()),
    }
    Ok(())
}

pub async fn delete(rt: &Runtime, id: &str) -> Result<(), CliError> {
    if rt.store().delete(id).await? {
        println!("Deleted {id}");
        Ok(())
    } else {
        Err(RuntimeError::NotFound(id.to_string()).into())
    }
}

pub async fn play(rt: &Runtime, id: &str, open: bool) -> Result<(), CliError> {
    let entry = rt
        .store()
        .get(id)
        .await?
        .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
    let url = resume::resume_url(&entry)?;
    println!("{url}");
    if open {
        open::that(url.as_str()).map_err(|e| CliError::Other(format!("could not open: {e}")))?;
    }
    Ok(())
}

pub async fn bookmark(
    rt: &Runtime,
    url: String,
    title: Option<String>,
    favicon: Option<String>,
) -> Result<(), CliError> {
    let info = TabInfo {
        id: CLI_TAB,
        url,
        title,
        fav_icon_url: favicon,
    };
    rt.tabs().insert(info, None).await;
    rt.tabs().activate(CLI_TAB).await;

    let entry = rt.bookmark_active().await?;
    println!("Bookmarked {}", entry.id);
    Ok(())
}

pub async fn settings(
    rt: &Runtime,
    theme: Option<Theme>,
    autosave: Option<String>,
) -> Result<(), CliError> {
    let settings = if theme.is_some() || autosave.is_some() {
        rt.store().update_settings(theme, autosave).await?
    } else {
        rt.store().settings().await?
    };
    println!("theme = {}", settings.theme);
    println!("autosave = {:?}", settings.autosave);
    let hosts = policy::allowed_hosts(&settings.autosave);
    if hosts.is_empty() {
        println!("Timer saves are off for every site.");
    } else {
        println!("Timer saves on: {}", hosts.join(", "));
    }
    Ok(())
}

pub async fn inspect(rt: &Runtime, path: &Path) -> Result<(), CliError> {
    let page = load_snapshot(path)?;
    let viewport = page.viewport();
    let videos = page.videos();

    println!("{} video element(s)", videos.len());
    for video in &videos {
        let score = conwatch_detect::score(video, viewport);
        if score == conwatch_detect::EXCLUDED {
            println!("  {}: excluded", video.id);
        } else {
            println!("  {}: score {score:.0}", video.id);
        }
    }

    let main = conwatch_detect::main_video(&page);
    let meta = conwatch_detect::extract(main.as_ref(), &page);
    match &main {
        Some(video) => println!("main video: {}", video.id),
        None => println!("main video: none"),
    }
    println!("title: {}", meta.title);
    println!("episode: {}", meta.episode);
    println!("thumbnail: {}", meta.thumbnail);
    println!("favicon: {}", meta.favicon);

    let settings = rt.store().settings().await?;
    let host = page.location().host_str().unwrap_or_default().to_string();
    println!(
        "timer saves on {host}: {}",
        if policy::allow_auto_save(&host, &settings.autosave) {
            "allowed"
        } else {
            "denied"
        }
    );
    Ok(())
}

pub async fn save(rt: &Runtime, path: &Path, periodic: bool) -> Result<(), CliError> {
    let page = load_snapshot(path)?;
    let trigger = if periodic {
        Trigger::Periodic
    } else {
        Trigger::Manual
    };
    let info = TabInfo {
        id: CLI_TAB,
        url: page.location().to_string(),
        title: Some(page.title()),
        fav_icon_url: None,
    };

    let (handle, task) = rt.open_page(info, page).await;
    let outcome = handle.save(trigger).await.map_err(RuntimeError::from)?;

    rt.tabs().remove(CLI_TAB).await;
    drop(handle);
    if let Ok(ctx) = task.await {
        for notice in &ctx.page().notices {
            println!("{notice}");
        }
    }

    match outcome {
        SaveOutcome::Saved { id, timestamp } => {
            println!("Saved {id} at {}", format_time(timestamp));
            Ok(())
        }
        SaveOutcome::NoVideoFound => Err(CliError::Other("no video found".into())),
        SaveOutcome::Paused => {
            println!("Video is paused; timer save skipped");
            Ok(())
        }
        SaveOutcome::AutoSaveDenied => {
            println!("Timer saves are not enabled for this site");
            Ok(())
        }
        SaveOutcome::Failed(reason) => Err(CliError::Other(reason)),
    }
}

/// Save the snapshot the way the keyboard shortcut does: the background asks
/// the focused tab for its video details and stores them.
pub async fn save_shortcut(rt: &Runtime, path: &Path) -> Result<(), CliError> {
    let page = load_snapshot(path)?;
    let info = TabInfo {
        id: CLI_TAB,
        url: page.location().to_string(),
        title: Some(page.title()),
        fav_icon_url: None,
    };

    let (handle, task) = rt.open_page(info, page).await;
    let saved = rt.manual_save().await;

    rt.tabs().remove(CLI_TAB).await;
    drop(handle);
    let _ = task.await;

    match saved? {
        Some(entry) => {
            println!("Saved {} at {}", entry.id, format_time(entry.timestamp));
            Ok(())
        }
        None => Err(CliError::Other("no video found".into())),
    }
}

pub fn resume(path: &Path) -> Result<(), CliError> {
    let mut page = load_snapshot(path)?;
    let mut coordinator = ResumeCoordinator::new();
    let location = page.location();
    coordinator.on_navigation(&location);

    // A snapshot never changes, so one poll decides.
    coordinator.poll(&mut page);
    if coordinator.is_scanning() {
        coordinator.expire();
    }

    match coordinator.state() {
        ResumeState::Idle => println!("No resume marker in {location}"),
        ResumeState::Resumed { video, position } => {
            println!("Resumed {video} at {}", format_time(*position));
            println!("{}", page.location());
        }
        ResumeState::TimedOut => println!("No ready video to resume"),
        ResumeState::Scanning { .. } => {}
    }
    Ok(())
}
