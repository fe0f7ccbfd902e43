use std::io::{self, BufRead};
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use tether_core::Session;
use tether_persist::{
    PersistError, PersistOptions, StateSetter, remember_persistent_state, with_storage,
};
use tether_storage::{FileStorage, MemoryStorage, SharedStorage, StorageConfig};

/// Greets the typed name and remembers it across runs.
///
/// Type a name to change it, or `:key NEW_KEY` to move the stored name to
/// another slot.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Keep state in memory only
    #[arg(long)]
    memory: bool,

    /// Storage directory, overrides TETHER_STORAGE_DIR
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Slot the name is stored under
    #[arg(long, default_value = "name")]
    key: String,
}

struct Screen {
    message: String,
    set_name: StateSetter<String>,
}

fn greeting(key: &str) -> Result<Screen, PersistError> {
    let (name, set_name) = remember_persistent_state::<String>(key, "", PersistOptions::json())?;

    let message = if name.is_empty() {
        "Please type your name".to_string()
    } else {
        format!("Hello {name}")
    };
    Ok(Screen { message, set_name })
}

fn open_storage(args: &Args) -> anyhow::Result<SharedStorage> {
    if args.memory {
        return Ok(Rc::new(MemoryStorage::new()));
    }

    let mut config = StorageConfig::from_env()?;
    if let Some(dir) = &args.dir {
        config = config.dir(dir.clone());
    }
    let storage = FileStorage::open(&config)?;
    log::info!("storing state in {}", storage.path().display());
    Ok(Rc::new(storage))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let storage = open_storage(&args)?;

    let mut key = args.key.clone();
    let mut session = Session::new();
    let compose = |session: &mut Session, key: &str| {
        with_storage(storage.clone(), || session.compose(|| greeting(key)))
    };

    let mut screen = compose(&mut session, &key)?;
    println!("{}", screen.message);

    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim_end();

        if let Some(new_key) = line.strip_prefix(":key ") {
            key = new_key.trim().to_string();
            log::info!("moving name to slot '{key}'");
        } else {
            screen.set_name.set(line.to_string())?;
        }

        screen = compose(&mut session, &key)?;
        println!("{}", screen.message);
    }

    session.end();
    Ok(())
}
