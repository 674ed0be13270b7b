use std::collections::HashMap;
use std::path::Path;

use crate::app::{AppContext, Result, ViewdeckError};
use crate::domain::{FeedQuery, FeedSnapshot, SettingsPatch, Theme, VideoKind};
use crate::store::{
    ClassificationRepository, HistoryRepository, SettingsRepository, SnapshotRepository,
};

pub async fn fetch(ctx: &AppContext, refresh: bool) -> Result<()> {
    let snapshot = if refresh {
        ctx.hub.refresh().await?
    } else {
        ctx.hub.load().await?
    };

    print_summary(&snapshot);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn list(
    ctx: &AppContext,
    filter: &str,
    sort: &str,
    search: Option<String>,
    keyword: Option<String>,
    classify: bool,
    json: bool,
) -> Result<()> {
    let query = FeedQuery {
        search,
        keyword,
        kind: filter.parse().map_err(ViewdeckError::Other)?,
        sort: sort.parse().map_err(ViewdeckError::Other)?,
    };

    let mut snapshot = ctx.hub.load().await?;
    if classify {
        let resolved = ctx.hub.classify_pending(&mut snapshot).await;
        if resolved > 0 {
            eprintln!("Classified {resolved} entries");
        }
    }

    let items = ctx.hub.filtered(&snapshot.items, &query);

    if json {
        let out = serde_json::to_string_pretty(&items)
            .map_err(|e| ViewdeckError::Other(e.to_string()))?;
        println!("{out}");
        return Ok(());
    }

    if items.is_empty() {
        println!("No videos match");
        return Ok(());
    }

    for item in &items {
        println!(
            "{} {} {}  [{}]",
            kind_marker(item.kind),
            item.published_at.format("%Y-%m-%d"),
            item.title,
            item.author_name
        );
    }

    Ok(())
}

pub fn import(ctx: &AppContext, path: &Path) -> Result<()> {
    let text = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(path)?
    };

    let snapshot = ctx.hub.import_manual(&text)?;
    if let Some(title) = &snapshot.channel_title {
        println!("Channel: {title}");
    }
    println!("Imported {} videos", snapshot.items.len());
    Ok(())
}

pub async fn classify(ctx: &AppContext) -> Result<()> {
    let mut snapshot = ctx.hub.load().await?;
    let pending = snapshot
        .items
        .iter()
        .filter(|i| !i.kind.is_resolved())
        .count();

    if pending == 0 {
        println!("Nothing to classify");
        return Ok(());
    }

    println!("Classifying {pending} entries...");
    let resolved = ctx.hub.classify_pending(&mut snapshot).await;
    let remaining = pending - resolved;

    println!("Resolved {resolved} entries, {remaining} still unknown");
    Ok(())
}

pub fn history(ctx: &AppContext, clear: bool) -> Result<()> {
    if clear {
        ctx.store.clear_history()?;
        println!("History cleared");
        return Ok(());
    }

    let entries = ctx.hub.history();
    if entries.is_empty() {
        println!("No watch history");
        return Ok(());
    }

    let titles = stored_titles(ctx);
    for entry in entries {
        let title = titles
            .get(&entry.video_id)
            .map(String::as_str)
            .unwrap_or(entry.video_id.as_str());
        let progress = entry
            .progress
            .map(|p| format!(" ({:.0}%)", p * 100.0))
            .unwrap_or_default();
        println!(
            "{} {}{}",
            entry.watched_at.format("%Y-%m-%d %H:%M"),
            title,
            progress
        );
    }

    Ok(())
}

pub fn settings(
    ctx: &AppContext,
    theme: Option<String>,
    autoplay: Option<bool>,
    ads: Option<bool>,
) -> Result<()> {
    let theme = match theme {
        Some(value) => Some(Theme::parse(&value).ok_or_else(|| {
            ViewdeckError::Other(format!(
                "unknown theme '{value}' (expected light, dark, or system)"
            ))
        })?),
        None => None,
    };

    let patch = SettingsPatch {
        theme,
        autoplay,
        ads_enabled: ads,
    };

    let settings = if patch.is_empty() {
        ctx.store.settings()?
    } else {
        ctx.store.update_settings(&patch)?
    };

    println!("theme       = {}", settings.theme);
    println!("autoplay    = {}", settings.autoplay);
    println!("ads_enabled = {}", settings.ads_enabled);
    Ok(())
}

pub fn clear(ctx: &AppContext, target: &str) -> Result<()> {
    match target {
        "snapshot" => ctx.store.clear_snapshot()?,
        "manual" => ctx.store.clear_manual()?,
        "classifications" => ctx.store.clear_kinds()?,
        "history" => ctx.store.clear_history()?,
        "all" => {
            ctx.store.clear_snapshot()?;
            ctx.store.clear_manual()?;
            ctx.store.clear_kinds()?;
            ctx.store.clear_history()?;
        }
        other => {
            return Err(ViewdeckError::Other(format!(
                "unknown clear target '{other}' (expected snapshot, manual, classifications, history, or all)"
            )));
        }
    }
    println!("Cleared {target}");
    Ok(())
}

fn print_summary(snapshot: &FeedSnapshot) {
    if let Some(title) = &snapshot.channel_title {
        println!("Channel: {title}");
    }

    let mut videos = 0;
    let mut shorts = 0;
    let mut unknown = 0;
    for item in &snapshot.items {
        match item.kind {
            VideoKind::Video => videos += 1,
            VideoKind::Short => shorts += 1,
            VideoKind::Unknown => unknown += 1,
        }
    }

    println!(
        "{} videos (captured {})",
        snapshot.items.len(),
        snapshot.captured_at.format("%Y-%m-%d %H:%M")
    );
    println!("  {videos} regular, {shorts} shorts, {unknown} unclassified");
}

fn kind_marker(kind: VideoKind) -> &'static str {
    match kind {
        VideoKind::Video => "[V]",
        VideoKind::Short => "[S]",
        VideoKind::Unknown => "[?]",
    }
}

/// Title lookup from whichever snapshot is stored, without touching the
/// network. Read failures just mean ids are shown instead of titles.
fn stored_titles(ctx: &AppContext) -> HashMap<String, String> {
    let snapshot = ctx
        .store
        .manual()
        .ok()
        .flatten()
        .or_else(|| ctx.store.snapshot_ignoring_ttl().ok().flatten());

    snapshot
        .map(|s| {
            s.items
                .into_iter()
                .map(|i| (i.video_id, i.title))
                .collect()
        })
        .unwrap_or_default()
}
