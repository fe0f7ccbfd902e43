use std::io::{self, BufRead};
use std::rc::Rc;

use clap::Parser;
use tether_core::prelude::*;

/// Greets whatever name is typed, one line at a time.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Initial contents of the name field
    #[arg(long, default_value = "")]
    name: String,
}

struct Screen {
    message: String,
    on_change: Rc<dyn Fn(String)>,
}

fn greeting(initial: &str) -> Screen {
    let name = remember(|| signal(initial.to_string()));

    let message = name.with(|n| {
        if n.is_empty() {
            "Please type your name".to_string()
        } else {
            format!("Hello {n}")
        }
    });

    Screen {
        message,
        on_change: Rc::new({
            let name = (*name).clone();
            move |value| name.set(value)
        }),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut session = Session::new();
    let mut screen = session.compose(|| greeting(&args.name));
    println!("{}", screen.message);

    for line in io::stdin().lock().lines() {
        let line = line?;
        (screen.on_change)(line.trim_end().to_string());
        screen = session.compose(|| greeting(&args.name));
        println!("{}", screen.message);
    }

    session.end();
    Ok(())
}
