use anyhow::Result;
use client_core::store::PageInfo;
use serde_json::json;
use shared::{domain::Song, protocol::Statistics};

pub fn songs(songs: &[Song], page: &PageInfo, as_json: bool) -> Result<()> {
    if as_json {
        let body = json!({
            "songs": songs,
            "total": page.total,
            "totalPages": page.total_pages,
            "currentPage": page.current_page,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if songs.is_empty() {
        println!("No songs found.");
        return Ok(());
    }
    for song in songs {
        println!("{}", song_line(song));
    }
    if page.total_pages > 1 {
        println!(
            "page {} of {} ({} songs)",
            page.current_page, page.total_pages, page.total
        );
    } else {
        println!("{} songs", page.total);
    }
    Ok(())
}

pub fn song(song: &Song, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(song)?);
    } else {
        println!("{}", song_line(song));
    }
    Ok(())
}

pub fn deleted(song: &Song, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", json!({ "deleted": song.id }));
    } else {
        println!("Deleted \"{}\" by {}", song.title, song.artist);
    }
    Ok(())
}

pub fn statistics(statistics: &Statistics, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(statistics)?);
        return Ok(());
    }
    for line in statistics_lines(statistics) {
        println!("{line}");
    }
    Ok(())
}

fn song_line(song: &Song) -> String {
    format!(
        "{}  {} - {} ({}) [{}]",
        song.id, song.title, song.artist, song.album, song.genre
    )
}

fn statistics_lines(statistics: &Statistics) -> Vec<String> {
    let mut lines = vec![
        format!("songs:   {}", statistics.total_songs),
        format!("artists: {}", statistics.total_artists),
        format!("albums:  {}", statistics.total_albums),
        format!("genres:  {}", statistics.total_genres),
    ];
    if !statistics.songs_per_genre.is_empty() {
        lines.push("per genre:".into());
        lines.extend(
            statistics
                .songs_per_genre
                .iter()
                .map(|genre| format!("  {:<20} {}", genre.genre, genre.count)),
        );
    }
    lines
}
