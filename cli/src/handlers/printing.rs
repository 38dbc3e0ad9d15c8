//! Handles displaying the output of various commands in a human readable format.

use std::fmt::Write;

use songswap_client::{
    session::{Mode, Phase, Session},
    state::{catalogue::Catalogue, history::History},
};
use songswap_core::{
    embed::{self, EmbedDescriptor},
    models::{Chain, Discovery, Song, SongId},
};

pub fn song(song: &Song) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    writeln!(output, "Song {}: {}", song.id, song.url)?;
    write!(output, "{}", embed(&song.url)?)?;
    writeln!(output, "\tPlatform: {}", song.platform)?;
    if let Some(crumb) = &song.context_crumb {
        writeln!(output, "\tContext: \"{crumb}\"")?;
    }
    writeln!(output, "\tAdded: {}", song.created_at.format("%Y-%m-%d %H:%M"))?;

    Ok(output)
}

/// How the link would be played.
pub fn embed(url: &str) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    let descriptor = embed::resolve(url);
    match (&descriptor, descriptor.player_url()) {
        (EmbedDescriptor::Video { id }, Some(player)) => {
            writeln!(output, "\tVideo {id}, play at {player}")?;
        }
        (EmbedDescriptor::Streaming { kind, id }, Some(player)) => {
            writeln!(output, "\tStreaming {kind} {id}, play at {player}")?;
        }
        (_, _) => writeln!(output, "\tNot embeddable, open {url}")?,
    }

    Ok(output)
}

pub fn chain(chain: &Chain) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    write!(
        output,
        "{}: \"{}\" ({} songs",
        chain.id, chain.name, chain.song_count
    )?;
    if let Some(creator) = &chain.creator_name {
        write!(output, ", by {creator}")?;
    }
    writeln!(output, ")")?;
    if let Some(description) = &chain.description {
        writeln!(output, "\t{description}")?;
    }

    Ok(output)
}

pub fn chains(chains: &[Chain]) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    if chains.is_empty() {
        writeln!(output, "No chains yet, create one!")?;
        return Ok(output);
    }

    writeln!(output, "Chains:")?;
    for chain in chains {
        for line in self::chain(chain)?.lines() {
            writeln!(output, "\t{line}")?;
        }
    }

    Ok(output)
}

/// The songs of a chain, marking the `highlighted` song and the `liked` ones.
pub fn chain_songs(
    songs: &[Song],
    highlighted: Option<SongId>,
    liked: impl Fn(&Song) -> bool,
) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    if songs.is_empty() {
        writeln!(output, "No songs in this chain yet")?;
        return Ok(output);
    }

    for song in songs {
        let marker = if highlighted == Some(song.id) { ">" } else { " " };
        let like = if liked(song) { " (liked)" } else { "" };
        writeln!(output, "{marker} {}: {}{like}", song.id, song.url)?;
        if let Some(crumb) = &song.context_crumb {
            writeln!(output, "\t\"{crumb}\"")?;
        }
    }

    Ok(output)
}

pub fn history(discoveries: &[Discovery]) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    if discoveries.is_empty() {
        writeln!(output, "Nothing discovered yet")?;
        return Ok(output);
    }

    writeln!(output, "History:")?;
    for discovery in discoveries {
        let liked = match discovery.liked {
            Some(true) => " (liked)",
            Some(false) => " (not liked)",
            None => "",
        };
        writeln!(
            output,
            "\t{} {}: {}{liked}",
            discovery.discovered_at.format("%Y-%m-%d %H:%M"),
            discovery.song.id,
            discovery.song.url
        )?;
    }

    Ok(output)
}

/// A snapshot of the interactive session.
pub fn session(session: &Session) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    match session.mode() {
        Mode::Discovery(single) => match &single.phase {
            Phase::Idle => writeln!(output, "No song yet, ask for the next one")?,
            Phase::Presented(current) => write!(output, "{}", song(current)?)?,
            Phase::Liked(current) => {
                write!(output, "{}", song(current)?)?;
                writeln!(output, "\tLiked")?;
            }
        },
        Mode::Chain(listing) => {
            writeln!(output, "Chain \"{}\":", listing.chain.name)?;
            if listing.loading {
                writeln!(output, "Loading...")?;
            } else {
                write!(
                    output,
                    "{}",
                    chain_songs(
                        &listing.songs,
                        session.highlighted_song(),
                        |song| session.is_liked_in_chain(song.id)
                    )?
                )?;
            }
        }
    }

    let form = session.form();
    if form.open {
        writeln!(output, "Submitting: {:?} {:?}", form.url, form.context)?;
    }
    if let Some(notice) = session.notice() {
        writeln!(output, "{notice}")?;
    }

    Ok(output)
}

pub fn catalogue(catalogue: &Catalogue) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    if let Some(notice) = &catalogue.notice {
        writeln!(output, "{notice}")?;
    }
    write!(output, "{}", chains(&catalogue.chains)?)?;

    Ok(output)
}

pub fn history_snapshot(history: &History) -> Result<String, std::fmt::Error> {
    let mut output = String::new();

    if let Some(notice) = &history.notice {
        writeln!(output, "{notice}")?;
    }
    write!(output, "{}", self::history(&history.discoveries)?)?;

    Ok(output)
}
