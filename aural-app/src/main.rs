//! Aural - headless music player
//!
//! Plays the files and folders given on the command line through the EQ and
//! effects graph, and takes line commands on stdin.

mod command;
mod output;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aural_audio::{AudioGraph, GraphConfig};
use aural_library::{expand_inputs, read_metadata, Config, NewTrack, TrackLoader};
use aural_player::{format_time, PlaybackState, Session};

use command::{parse_command, Command, HELP};
use output::CpalSink;

/// Frame rate for position updates
const FPS: u64 = 30;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aural=info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = Config::load();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No audio output device found")?;
    let supported = device
        .default_output_config()
        .context("Failed to get audio config")?;
    let sample_rate = supported.sample_rate().0;

    let mut stream_config: cpal::StreamConfig = supported.into();
    if let Some(frames) = config.buffer_frames {
        stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
    }
    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate,
        channels = stream_config.channels,
        "Output device ready"
    );

    let loader = TrackLoader::with_sample_rate(sample_rate);
    let (graph, renderer, tap) = AudioGraph::new(GraphConfig::new(sample_rate), Box::new(loader));
    let sink = CpalSink::new(&device, &stream_config, renderer)
        .context("Failed to create audio stream")?;

    let mut session = Session::new(graph, tap, Box::new(sink), rand::random());
    session.set_volume(config.volume);
    session.set_shuffle(config.shuffle);
    session.set_repeat(config.repeat);

    let mut inputs: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if inputs.is_empty() {
        if let Some(folder) = config.last_folder.clone() {
            info!(folder = %folder.display(), "Reopening last folder");
            inputs.push(folder);
        }
    }
    add_inputs(&mut session, &mut config, &inputs);

    println!("{}", HELP);
    let lines = spawn_stdin_reader();
    run(&mut session, &mut config, &lines);

    config.volume = session.effects().volume;
    config.shuffle = session.controller().shuffle();
    config.repeat = session.controller().repeat();
    if let Err(e) = config.save() {
        warn!(error = %e, "Could not save config");
    }

    session.shutdown();
    Ok(())
}

/// Forward stdin lines to the main loop; the channel closes on EOF
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::bounded(64);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn run(session: &mut Session, config: &mut Config, lines: &Receiver<String>) {
    let tick = Duration::from_millis(1000 / FPS);
    let mut last_state = session.controller().state();

    loop {
        match lines.recv_timeout(tick) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(Command::Quit) => break,
                    Some(command) => execute(session, config, command),
                    None => println!("unknown command: {} (try 'help')", line.trim()),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Err(e) = session.poll() {
            warn!(error = %e, "Playback error");
        }

        let state = session.controller().state();
        if state != last_state {
            if state == PlaybackState::Playing || state == PlaybackState::Ended {
                print_status(session);
            }
            last_state = state;
        }
    }
}

fn execute(session: &mut Session, config: &mut Config, command: Command) {
    let result = match command {
        Command::Play => session.play(),
        Command::Pause => session.pause(),
        Command::Toggle => session.toggle_play(),
        Command::Next => session.next(),
        Command::Previous => session.previous(),
        Command::Seek(secs) => session.seek(secs).map(|_| ()),
        Command::SetBand(band, db) => {
            match session.set_band_gain(band, db) {
                Some(gain) => println!("band {} = {:+.1} dB", band + 1, gain),
                None => println!("no such band"),
            }
            Ok(())
        }
        Command::Preset(name) => {
            if !session.apply_preset(&name) {
                println!("unknown preset '{}'", name);
            }
            Ok(())
        }
        Command::Volume(v) => {
            session.set_volume(v);
            Ok(())
        }
        Command::Gain(db) => {
            session.set_gain(db);
            Ok(())
        }
        Command::Reverb(x) => {
            session.set_reverb(x);
            Ok(())
        }
        Command::Delay(x) => {
            session.set_delay(x);
            Ok(())
        }
        Command::ToggleShuffle => {
            let shuffle = !session.controller().shuffle();
            session.set_shuffle(shuffle);
            println!("shuffle {}", if shuffle { "on" } else { "off" });
            Ok(())
        }
        Command::Repeat(mode) => {
            session.set_repeat(mode);
            Ok(())
        }
        Command::Add(path) => {
            add_inputs(session, config, &[path]);
            Ok(())
        }
        Command::Remove(index) => match track_id_at(session, index) {
            Some(id) => session.remove(id).map(|t| println!("removed {}", t.name)),
            None => {
                println!("no track at {}", index + 1);
                Ok(())
            }
        },
        Command::Move(from, to) => session.reorder(from, to),
        Command::Jump(index) => match track_id_at(session, index) {
            Some(id) => session.play_track(id),
            None => {
                println!("no track at {}", index + 1);
                Ok(())
            }
        },
        Command::List => {
            print_playlist(session);
            Ok(())
        }
        Command::Status => {
            print_status(session);
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Command::Quit => Ok(()),
    };

    if let Err(e) = result {
        println!("error: {}", e);
    }
}

fn track_id_at(session: &Session, index: usize) -> Option<aural_library::TrackId> {
    session.playlist().track_at(index).map(|t| t.id)
}

/// Expand files and folders into tracks and append them
fn add_inputs(session: &mut Session, config: &mut Config, inputs: &[PathBuf]) {
    if let Some(folder) = inputs.iter().rev().find(|p| p.is_dir()) {
        config.last_folder = Some(folder.clone());
    }

    let tracks: Vec<NewTrack> = expand_inputs(inputs).iter().map(|p| new_track(p)).collect();
    if tracks.is_empty() {
        if !inputs.is_empty() {
            println!("no audio files found");
        }
        return;
    }
    session.append(tracks);
}

/// Track entry named from tags when present, else the file name
fn new_track(path: &Path) -> NewTrack {
    let mut track = NewTrack::from_path(path);
    if let Ok(meta) = read_metadata(path) {
        if let Some(title) = meta.title {
            track.name = title;
        }
        track.artist = meta.artist;
        track.album = meta.album;
    }
    track
}

fn print_playlist(session: &Session) {
    let current = session.controller().current();
    for (i, track) in session.playlist().tracks().iter().enumerate() {
        let marker = if Some(track.id) == current { ">" } else { " " };
        let duration = track.duration.map(format_time).unwrap_or_else(|| "-:--".into());
        match &track.artist {
            Some(artist) => println!("{}{:3}. {} - {} [{}]", marker, i + 1, artist, track.name, duration),
            None => println!("{}{:3}. {} [{}]", marker, i + 1, track.name, duration),
        }
    }
}

fn print_status(session: &Session) {
    let snap = session.snapshot();
    let title = snap
        .current_track
        .as_ref()
        .map_or("(nothing)", |t| t.name.as_str());
    println!(
        "[{:?}] {} {}/{} | vol {:.2} gain {:+.1} dB reverb {:.2} delay {:.2} | shuffle {} repeat {} | eq {}",
        snap.state,
        title,
        format_time(snap.current_time),
        format_time(snap.duration),
        snap.volume,
        snap.gain,
        snap.reverb,
        snap.delay,
        if snap.shuffle { "on" } else { "off" },
        snap.repeat,
        snap.active_preset.unwrap_or("custom"),
    );
}
