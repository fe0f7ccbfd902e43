use std::fmt;
use std::io::{self, BufRead};

use clap::Parser;
use tether_core::prelude::*;
use tether_resource::{
    ResetHandle, Status, block_on_request, remember_error_boundary, remember_request,
};

/// Looks up pokemon by name in a small built-in Pokédex.
///
/// Type a name to fetch it. After a failed lookup, `:retry` clears the form.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Pokemon to look up on start
    #[arg(long, default_value = "")]
    name: String,
}

#[derive(Clone, Debug)]
struct Pokemon {
    name: String,
    number: u32,
    types: Vec<String>,
}

#[derive(Clone, Debug)]
struct FetchError(String);

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for FetchError {}

const POKEDEX: &[(&str, u32, &[&str])] = &[
    ("bulbasaur", 1, &["grass", "poison"]),
    ("charmander", 4, &["fire"]),
    ("squirtle", 7, &["water"]),
    ("pikachu", 25, &["electric"]),
    ("mew", 151, &["psychic"]),
];

async fn fetch_pokemon(name: String) -> Result<Pokemon, FetchError> {
    let wanted = name.trim().to_lowercase();
    POKEDEX
        .iter()
        .find(|(n, _, _)| *n == wanted)
        .map(|(n, number, types)| Pokemon {
            name: n.to_string(),
            number: *number,
            types: types.iter().map(|t| t.to_string()).collect(),
        })
        .ok_or_else(|| {
            FetchError(format!(
                "The pokemon \"{name}\" is not in the database. Try \"pikachu\", \"mew\", or \"bulbasaur\"."
            ))
        })
}

fn pokemon_info(name: &str) -> Result<String, FetchError> {
    let request = remember_request::<Pokemon, FetchError>(name, |ticket| {
        let name = ticket.key().to_string();
        block_on_request(ticket, fetch_pokemon(name));
    });

    request.with_status(|status| match status {
        Status::Idle => Ok("Submit a pokemon".to_string()),
        Status::Pending => Ok(format!("Loading {name}...")),
        Status::Resolved(p) => Ok(format!("#{:03} {} ({})", p.number, p.name, p.types.join("/"))),
        Status::Rejected(e) => Err(e.clone()),
    })
}

struct Screen {
    text: String,
    name: Signal<String>,
    reset: Option<ResetHandle>,
}

fn app(initial: &str) -> Screen {
    let name = (*remember(|| signal(initial.to_string()))).clone();
    let current = name.get();

    let boundary = remember_error_boundary::<FetchError>();
    boundary.on_reset({
        let name = name.clone();
        move || name.set(String::new())
    });

    let (text, reset) = boundary.render(
        &[current.as_str()],
        || pokemon_info(&current).map(|text| (text, None)),
        |error, reset| (format!("There was an error: {error}\n[:retry to try again]"), Some(reset)),
    );

    Screen { text, name, reset }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut session = Session::new();
    let mut screen = session.compose(|| app(&args.name));
    println!("{}", screen.text);

    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();

        if line == ":retry" {
            match &screen.reset {
                Some(reset) => reset.reset(),
                None => log::info!("nothing to retry"),
            }
        } else {
            screen.name.set(line.to_string());
        }

        screen = session.compose(|| app(&args.name));
        println!("{}", screen.text);
    }

    session.end();
    Ok(())
}
