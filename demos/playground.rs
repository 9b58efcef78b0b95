//! Play the demo patch and drive the transport from the terminal.
//!
//! Run with: cargo run --example playground --features cpal_sink
//!
//! Commands (one per line): `p` pause/resume, `r` rewind, `e` toggle the
//! envelope view, `q` quit.

use std::io::{self, BufRead, Write};

use patchwire::{patch, Config, CpalDevice, DeviceError, Key};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let devices = CpalDevice::list_outputs();
    if devices.is_empty() {
        return Err(DeviceError::NoDevice.into());
    }

    println!("Available audio output devices:");
    for (i, device) in devices.iter().enumerate() {
        println!("  [{}] {} ({}Hz, {} ch)", i, device.name(), device.sample_rate(), device.channels());
    }

    print!("\nSelect device [0]: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let choice: usize = input.trim().parse().unwrap_or(0);
    let device = devices.get(choice).unwrap_or(&devices[0]);

    let config = Config::default().with_sample_rate(device.sample_rate());
    let (engine, mut editor) = patch::demo(config.clone())?;
    let playback = device.play(engine, config.ready_timeout)?;
    editor.key(Key::Space)?;

    println!("Playing on {}. p = pause, r = rewind, e = envelopes, q = quit", device.name());
    for line in io::stdin().lock().lines() {
        let key = match line?.trim() {
            "p" => Key::Space,
            "r" => Key::Rewind,
            "e" => Key::Envelopes,
            "q" => Key::Escape,
            _ => continue,
        };
        editor.key(key)?;

        if editor.exit_requested() || playback.failed() {
            break;
        }
        if editor.envelope_view() {
            for (id, view) in editor.nodes() {
                let keyframes = view.keyframes(0).map_or(0, <[_]>::len);
                println!("  {} {:<8} pitch {:+.3} ({keyframes} keyframes)", id, view.kind.name(), editor.envelope_value(id, 0).unwrap_or(0.0));
            }
        }
        println!("t = {} underflows = {} paused = {}", editor.offset(), editor.underflows(), editor.is_paused());
    }

    Ok(())
}
