// Pulsebox demo - metronome and music box front-ends on the command line

use pulsebox::{
    CpalSink, Payload, PlaybackUpdate, Player, SchedulerConfig, Song, StopReason, Timeline,
    builtin_songs, song_by_key,
};
use ringbuf::traits::Consumer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Sixteenth-note resolution, as the metronome grid tracks
const SUBDIVISIONS_PER_BEAT: u32 = 4;

fn main() {
    env_logger::init();

    println!("=== Pulsebox ===\n");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("songs") => {
            list_songs();
            Ok(())
        }
        Some("metronome") => run_metronome(&args[1..]),
        Some("play") => run_music_box(&args[1..]),
        _ => {
            print_usage();
            Ok(())
        }
    };

    if let Err(message) = result {
        eprintln!("ERROR: {message}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  pulsebox songs                             list bundled songs and presets");
    println!("  pulsebox metronome [bpm] [beats]           click track (default 120 BPM, 4/4)");
    println!("  pulsebox play <song-key> [bpm] [--once]    play a bundled song");
    println!("  pulsebox play --file <song.json> [--once]  play a song from a JSON file");
    println!("\nPress Enter to stop.");
}

fn list_songs() {
    println!("Bundled songs and presets:");
    for song in builtin_songs() {
        println!(
            "  {:16} {} ({:.0} BPM, {} notes)",
            song.key,
            song.name,
            song.recommended_bpm,
            song.notes.len()
        );
    }
}

fn run_metronome(args: &[String]) -> Result<(), String> {
    let bpm: f64 = parse_or(args.first(), 120.0)?;
    let beats_per_measure: u32 = parse_or(args.get(1), 4)?;
    if beats_per_measure == 0 {
        return Err("measure must have at least one beat".to_string());
    }

    let sink = CpalSink::open().map_err(|e| e.to_string())?;
    let (mut player, mut updates) = Player::new(sink.handle(), SchedulerConfig::default());

    let grid = Timeline::click_grid(beats_per_measure, SUBDIVISIONS_PER_BEAT);
    player
        .set_timeline(grid, SUBDIVISIONS_PER_BEAT)
        .map_err(|e| e.to_string())?;
    player.set_bpm(bpm).map_err(|e| e.to_string())?;
    player.set_looping(true);

    println!(
        "Metronome: {:.0} BPM, {}/4 (press Enter to stop)\n",
        player.bpm(),
        beats_per_measure
    );
    player.start().map_err(|e| e.to_string())?;

    let quit = spawn_stdin_watch();
    loop {
        while let Some(update) = updates.try_pop() {
            if let PlaybackUpdate::Step { index, .. } = update {
                let beat = index as u32 / SUBDIVISIONS_PER_BEAT + 1;
                if beat == 1 {
                    println!("| {beat}");
                } else {
                    println!("  {beat}");
                }
            }
        }
        if quit.load(Ordering::Relaxed) {
            player.stop();
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }

    println!("\nStopped.");
    Ok(())
}

fn run_music_box(args: &[String]) -> Result<(), String> {
    let mut looping = true;
    let mut bpm_override: Option<f64> = None;
    let mut song: Option<Song> = None;

    let mut rest = args.iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--once" => looping = false,
            "--file" => {
                let path = rest.next().ok_or("--file needs a path")?;
                let json = std::fs::read_to_string(path)
                    .map_err(|e| format!("cannot read {path}: {e}"))?;
                song = Some(
                    serde_json::from_str(&json).map_err(|e| format!("invalid song file: {e}"))?,
                );
            }
            other => {
                if let Ok(bpm) = other.parse::<f64>() {
                    bpm_override = Some(bpm);
                } else {
                    song = Some(song_by_key(other).ok_or_else(|| {
                        format!("unknown song key '{other}' (try `pulsebox songs`)")
                    })?);
                }
            }
        }
    }

    let song = song.ok_or("play needs a song key or --file")?;
    let timeline = song.to_timeline().map_err(|e| e.to_string())?;

    let sink = CpalSink::open().map_err(|e| e.to_string())?;
    let (mut player, mut updates) = Player::new(sink.handle(), SchedulerConfig::default());

    player.set_timeline(timeline, 1).map_err(|e| e.to_string())?;
    player
        .set_bpm(bpm_override.unwrap_or(song.recommended_bpm))
        .map_err(|e| e.to_string())?;
    player.set_looping(looping);

    println!(
        "Playing '{}' at {:.0} BPM{} (press Enter to stop)\n",
        song.name,
        player.bpm(),
        if looping { ", looping" } else { "" }
    );
    player.start().map_err(|e| e.to_string())?;

    let quit = spawn_stdin_watch();
    let total = song.notes.len();
    loop {
        let mut finished = false;
        while let Some(update) = updates.try_pop() {
            match update {
                PlaybackUpdate::Step { index, payload, .. } => {
                    if let Payload::Tone { note, chord, .. } = payload {
                        match chord {
                            Some(chord) => {
                                println!("  {:>2}/{total}  {note:4} [{chord}]", index + 1)
                            }
                            None => println!("  {:>2}/{total}  {note}", index + 1),
                        }
                    }
                }
                PlaybackUpdate::Stopped { reason } => {
                    if let StopReason::Fault(err) = &reason {
                        eprintln!("playback fault: {err}");
                    }
                    finished = true;
                }
                PlaybackUpdate::Started { .. } => {}
            }
        }
        if finished {
            break;
        }
        if quit.load(Ordering::Relaxed) {
            player.stop();
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }

    println!("\nStopped.");
    Ok(())
}

fn parse_or<T: std::str::FromStr>(arg: Option<&String>, default: T) -> Result<T, String> {
    match arg {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("cannot parse argument '{raw}'")),
    }
}

fn spawn_stdin_watch() -> Arc<AtomicBool> {
    let quit = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&quit);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        flag.store(true, Ordering::Relaxed);
    });
    quit
}
