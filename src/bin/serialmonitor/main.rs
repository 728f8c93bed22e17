//! Terminal for recorder boards on the serial ports.

use clap::Parser;
use log::info;
use teerec::{
    args::MonitorArgs,
    gui::device_selector,
    serial::{discover, discovery::SYSFS_ROOT, spawn_keyboard_forwarder, ModelTable, Monitor},
};

use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    teerec::logger("RUST_LOG").init();
    let args = MonitorArgs::parse();

    let models = match &args.models {
        Some(path) => ModelTable::from_ron(path)?,
        None => ModelTable::default(),
    };

    if args.list {
        for device in discover(&models, SYSFS_ROOT)? {
            println!("{}", device);
        }
        return Ok(());
    }

    let device = match args.device {
        Some(path) => Some(path),
        None => {
            let known: Vec<_> = discover(&models, SYSFS_ROOT)?
                .into_iter()
                .filter(|d| d.is_known())
                .collect();
            if known.len() > 1 {
                let entries: Vec<String> = known.iter().map(|d| d.to_string()).collect();
                match device_selector(&entries)? {
                    Some(k) => Some(known[k].path.clone()),
                    None => return Ok(()),
                }
            } else {
                known.into_iter().next().map(|d| d.path)
            }
        }
    };
    if let Some(path) = &device {
        info!("monitoring {}", path.display());
    }

    let mut monitor = Monitor::new(device, args.baud).models(models);
    if let Some(path) = &args.logfile {
        monitor = monitor.log_file(path)?;
    }
    if !args.no_input {
        monitor = monitor.keyboard(spawn_keyboard_forwarder());
    }
    monitor.run()?;
    Ok(())
}
